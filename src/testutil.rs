//! Builders for synthetic ELF images with DWARF data, used by the test suite.

use gimli::constants::{self, DwAt, DwForm, DwTag};

/// Appends an unsigned LEB128 value.
pub fn push_uleb(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Builds a `.debug_abbrev` table.
#[derive(Default)]
pub struct Abbrevs {
    bytes: Vec<u8>,
    open: bool,
}

impl Abbrevs {
    /// Creates an empty table.
    pub fn new() -> Self {
        Abbrevs::default()
    }

    fn close_decl(&mut self) {
        if self.open {
            self.bytes.extend_from_slice(&[0, 0]);
            self.open = false;
        }
    }

    /// Starts an abbreviation declaration.
    pub fn start(mut self, code: u64, tag: DwTag, has_children: bool) -> Self {
        self.close_decl();
        push_uleb(&mut self.bytes, code);
        push_uleb(&mut self.bytes, u64::from(tag.0));
        self.bytes.push(has_children as u8);
        self.open = true;
        self
    }

    /// Declares an attribute on the current abbreviation.
    pub fn attr(mut self, name: DwAt, form: DwForm) -> Self {
        push_uleb(&mut self.bytes, u64::from(name.0));
        push_uleb(&mut self.bytes, u64::from(form.0));
        self
    }

    /// Terminates the table and returns its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.close_decl();
        self.bytes.push(0);
        self.bytes
    }
}

/// Builds a DIE byte stream.
#[derive(Default)]
pub struct Dies {
    bytes: Vec<u8>,
}

impl Dies {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Dies::default()
    }

    /// Appends an abbreviation code.
    pub fn code(mut self, code: u64) -> Self {
        push_uleb(&mut self.bytes, code);
        self
    }

    /// Appends a sibling-list terminator.
    pub fn terminator(self) -> Self {
        self.code(0)
    }

    /// Appends an inline string value (`DW_FORM_string`).
    pub fn string(mut self, value: &str) -> Self {
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        self
    }

    /// Appends a ULEB128 value (`DW_FORM_udata`).
    pub fn udata(mut self, value: u64) -> Self {
        push_uleb(&mut self.bytes, value);
        self
    }

    /// Appends a one-byte value.
    pub fn data1(mut self, value: u8) -> Self {
        self.bytes.push(value);
        self
    }

    /// Appends a four-byte value (`DW_FORM_data4`, `DW_FORM_ref4`, `DW_FORM_sec_offset`).
    pub fn data4(mut self, value: u32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends raw bytes.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Returns the stream bytes.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Wraps a DIE stream into a DWARF version 4 compilation unit.
pub fn compile_unit_v4(abbrev_offset: u32, dies: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(dies.len() + 11);
    out.extend_from_slice(&((7 + dies.len()) as u32).to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&abbrev_offset.to_le_bytes());
    out.push(8);
    out.extend_from_slice(dies);
    out
}

/// Wraps a DIE stream into a DWARF version 5 compilation unit.
pub fn compile_unit_v5(abbrev_offset: u32, dies: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(dies.len() + 12);
    out.extend_from_slice(&((8 + dies.len()) as u32).to_le_bytes());
    out.extend_from_slice(&5u16.to_le_bytes());
    out.push(constants::DW_UT_compile.0);
    out.push(8);
    out.extend_from_slice(&abbrev_offset.to_le_bytes());
    out.extend_from_slice(dies);
    out
}

fn line_prologue_tail() -> Vec<u8> {
    // minimum_instruction_length, maximum_operations_per_instruction, default_is_stmt,
    // line_base (-5), line_range, opcode_base and the standard opcode lengths.
    let mut out = vec![1, 1, 1, 0xfb, 14, 13];
    out.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
    out
}

/// Builds a DWARF version 4 `.debug_line` unit holding only a file table.
///
/// Version 4 numbers files from 1, so `files[0]` is file number 1.
pub fn line_program_v4(files: &[&str]) -> Vec<u8> {
    let mut rest = line_prologue_tail();
    rest.push(0); // no include directories
    for file in files {
        rest.extend_from_slice(file.as_bytes());
        rest.push(0);
        push_uleb(&mut rest, 0); // directory index
        push_uleb(&mut rest, 0); // mtime
        push_uleb(&mut rest, 0); // length
    }
    rest.push(0);

    let mut out = Vec::new();
    out.extend_from_slice(&((2 + 4 + rest.len()) as u32).to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&(rest.len() as u32).to_le_bytes());
    out.extend_from_slice(&rest);
    out
}

/// Builds a DWARF version 5 `.debug_line` unit holding only a file table.
///
/// Version 5 numbers files from 0, so `files[0]` is file number 0.
pub fn line_program_v5(files: &[&str]) -> Vec<u8> {
    let mut rest = line_prologue_tail();
    // One directory and one filename entry format: DW_LNCT_path as DW_FORM_string.
    rest.push(1);
    push_uleb(&mut rest, u64::from(constants::DW_LNCT_path.0));
    push_uleb(&mut rest, u64::from(constants::DW_FORM_string.0));
    push_uleb(&mut rest, 1);
    rest.extend_from_slice(b".\0");
    rest.push(1);
    push_uleb(&mut rest, u64::from(constants::DW_LNCT_path.0));
    push_uleb(&mut rest, u64::from(constants::DW_FORM_string.0));
    push_uleb(&mut rest, files.len() as u64);
    for file in files {
        rest.extend_from_slice(file.as_bytes());
        rest.push(0);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&((2 + 1 + 1 + 4 + rest.len()) as u32).to_le_bytes());
    out.extend_from_slice(&5u16.to_le_bytes());
    out.push(8); // address size
    out.push(0); // segment selector size
    out.extend_from_slice(&(rest.len() as u32).to_le_bytes());
    out.extend_from_slice(&rest);
    out
}

/// Builds a minimal little-endian ELF64 image from named sections.
#[derive(Default)]
pub struct ElfBuilder {
    sections: Vec<(String, Vec<u8>)>,
}

impl ElfBuilder {
    /// Creates a builder with no sections.
    pub fn new() -> Self {
        ElfBuilder::default()
    }

    /// Adds a section.
    pub fn section(mut self, name: &str, data: &[u8]) -> Self {
        self.sections.push((name.to_owned(), data.to_vec()));
        self
    }

    /// Produces the image bytes.
    pub fn build(self) -> Vec<u8> {
        const EHSIZE: usize = 64;
        const SHENTSIZE: usize = 64;

        // String table: a leading NUL, then all section names, then ".shstrtab".
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for (name, _) in &self.sections {
            name_offsets.push(shstrtab.len());
            shstrtab.extend_from_slice(name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name_offset = shstrtab.len();
        shstrtab.extend_from_slice(b".shstrtab\0");

        // Layout: header, section data, string table, section header table.
        let mut out = vec![0u8; EHSIZE];
        let mut data_offsets = Vec::new();
        for (_, data) in &self.sections {
            data_offsets.push(out.len());
            out.extend_from_slice(data);
        }
        let shstrtab_offset = out.len();
        out.extend_from_slice(&shstrtab);
        while out.len() % 8 != 0 {
            out.push(0);
        }
        let shoff = out.len();

        let shnum = self.sections.len() + 2;
        let push_shdr = |out: &mut Vec<u8>,
                         name: u32,
                         sh_type: u32,
                         offset: u64,
                         size: u64| {
            out.extend_from_slice(&name.to_le_bytes());
            out.extend_from_slice(&sh_type.to_le_bytes());
            out.extend_from_slice(&0u64.to_le_bytes()); // flags
            out.extend_from_slice(&0u64.to_le_bytes()); // addr
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // link
            out.extend_from_slice(&0u32.to_le_bytes()); // info
            out.extend_from_slice(&1u64.to_le_bytes()); // addralign
            out.extend_from_slice(&0u64.to_le_bytes()); // entsize
        };

        push_shdr(&mut out, 0, 0, 0, 0);
        for (index, (_, data)) in self.sections.iter().enumerate() {
            push_shdr(
                &mut out,
                name_offsets[index] as u32,
                goblin::elf::section_header::SHT_PROGBITS,
                data_offsets[index] as u64,
                data.len() as u64,
            );
        }
        push_shdr(
            &mut out,
            shstrtab_name_offset as u32,
            goblin::elf::section_header::SHT_STRTAB,
            shstrtab_offset as u64,
            shstrtab.len() as u64,
        );

        // ELF header.
        out[0..4].copy_from_slice(&goblin::elf::header::ELFMAG[..]);
        out[4] = goblin::elf::header::ELFCLASS64;
        out[5] = goblin::elf::header::ELFDATA2LSB;
        out[6] = 1; // EV_CURRENT
        out[16..18].copy_from_slice(&goblin::elf::header::ET_REL.to_le_bytes());
        out[18..20].copy_from_slice(&goblin::elf::header::EM_X86_64.to_le_bytes());
        out[20..24].copy_from_slice(&1u32.to_le_bytes());
        out[40..48].copy_from_slice(&(shoff as u64).to_le_bytes());
        out[52..54].copy_from_slice(&(EHSIZE as u16).to_le_bytes());
        out[58..60].copy_from_slice(&(SHENTSIZE as u16).to_le_bytes());
        out[60..62].copy_from_slice(&(shnum as u16).to_le_bytes());
        out[62..64].copy_from_slice(&((shnum - 1) as u16).to_le_bytes());

        out
    }
}

/// An image with `num_units` compilation units, each holding `children` flat child entries.
///
/// Every unit decodes to `children + 2` rows: the unit entry, the children, and one terminator.
pub fn flat_units_fixture(num_units: usize, children: usize) -> Vec<u8> {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .start(2, constants::DW_TAG_variable, false)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .finish();

    let mut info = Vec::new();
    for unit in 0..num_units {
        let mut dies = Dies::new().code(1).string(&format!("unit_{unit}.c"));
        for child in 0..children {
            dies = dies.code(2).string(&format!("v{child}"));
        }
        info.extend_from_slice(&compile_unit_v4(0, &dies.terminator().finish()));
    }

    ElfBuilder::new()
        .section(".debug_info", &info)
        .section(".debug_abbrev", &abbrev)
        .build()
}

/// An image with one compilation unit: a root entry named `test.c` with children, followed by
/// the given raw DIE stream bytes.
pub fn single_unit_fixture(version: u16, raw_dies_after_root: &[u8]) -> Vec<u8> {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .finish();

    let dies = Dies::new()
        .code(1)
        .string("test.c")
        .raw(raw_dies_after_root)
        .finish();
    let info = match version {
        5 => compile_unit_v5(0, &dies),
        _ => compile_unit_v4(0, &dies),
    };

    ElfBuilder::new()
        .section(".debug_info", &info)
        .section(".debug_abbrev", &abbrev)
        .build()
}
