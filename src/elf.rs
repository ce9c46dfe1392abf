//! Locating debug sections inside an ELF image.

use goblin::elf;
use goblin::elf::section_header::SHT_NOBITS;

use crate::error::{Error, ErrorKind};

/// A parsed ELF image with access to its sections by name.
#[derive(Debug)]
pub struct ElfImage<'data> {
    elf: elf::Elf<'data>,
    data: &'data [u8],
}

impl<'data> ElfImage<'data> {
    /// Tests whether the buffer could contain an ELF image.
    pub fn test(data: &[u8]) -> bool {
        data.get(0..elf::header::SELFMAG)
            .is_some_and(|magic| magic == elf::header::ELFMAG)
    }

    /// Parses an ELF image from the given slice.
    pub fn parse(data: &'data [u8]) -> Result<Self, Error> {
        let elf = elf::Elf::parse(data)
            .map_err(|e| Error::with_source(ErrorKind::CannotParseElf, "invalid ELF image", e))?;
        Ok(ElfImage { elf, data })
    }

    /// Returns the raw data of the section with the given name.
    ///
    /// The name may be given with or without the leading dot, so both `".debug_info"` and
    /// `"debug_info"` resolve to the same section. Sections without file data (`SHT_NOBITS`)
    /// are not returned.
    pub fn section(&self, name: &str) -> Option<&'data [u8]> {
        let wanted = name.strip_prefix('.').unwrap_or(name);
        for header in &self.elf.section_headers {
            if header.sh_type == SHT_NOBITS {
                continue;
            }
            let section_name = match self.elf.shdr_strtab.get_at(header.sh_name) {
                Some(name) => name,
                None => continue,
            };
            if section_name.strip_prefix('.').unwrap_or(section_name) != wanted {
                continue;
            }
            let range = match header.file_range() {
                Some(range) => range,
                None => continue,
            };
            return self.data.get(range);
        }
        None
    }

    /// Determines whether the specified section exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }
}
