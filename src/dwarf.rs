//! The DWARF context and the entry decoder.
//!
//! [`DwarfImage`] owns the input bytes and the [`gimli`] structures borrowed from them. All
//! work that requires sequential access (parsing unit headers, abbreviation tables and the unit
//! DIE) happens eagerly when the image is opened, so that [`parse_entries`] afterwards only
//! reads immutable per-unit state and can run on any number of threads.

use std::mem;
use std::sync::Arc;

use gimli::read::AttributeValue;
use gimli::{constants, DebugLineOffset, DwTag, UnitOffset};
use symbolic_common::{AsSelf, ByteView, SelfCell};

use crate::columns::{Chunk, Column, DictBuilder, DictStrArrayColumn, DictStrColumn, DictU64Column, StringDict, U64ArrayColumn};
use crate::elf::ElfImage;
use crate::error::{Error, ErrorKind};
use crate::registry::{encoding_name, language_name, DictRegistry};
use crate::schema::{DwarfColumn, Projection};

type Slice<'d> = gimli::read::EndianSlice<'d, gimli::LittleEndian>;
type Dwarf<'d> = gimli::read::Dwarf<Slice<'d>>;
type Unit<'d> = gimli::read::Unit<Slice<'d>>;

/// The row cap of a single chunk. A unit with more entries is delivered as several chunks.
pub(crate) const MAX_ROWS_PER_CHUNK: usize = 65536;

/// Cap on logged warnings while building one unit's filename table.
const MAX_LINE_WARNINGS: u32 = 10;

/// Section slices and eagerly constructed compilation units.
pub(crate) struct DwarfData<'d> {
    dwarf: Dwarf<'d>,
    units: Vec<Unit<'d>>,
    has_debug_line: bool,
}

impl<'d> DwarfData<'d> {
    /// Parses the ELF image and constructs all compilation units.
    pub fn parse(data: &'d [u8]) -> Result<Self, Error> {
        let elf = ElfImage::parse(data)?;

        let info = elf
            .section(".debug_info")
            .ok_or_else(|| Error::new(ErrorKind::CannotParseElf, "no .debug_info section"))?;
        let abbrev = elf
            .section(".debug_abbrev")
            .ok_or_else(|| Error::new(ErrorKind::CannotParseElf, "no .debug_abbrev section"))?;
        tracing::debug!(
            debug_info = info.len(),
            debug_abbrev = abbrev.len(),
            "located DWARF sections"
        );

        // Missing optional sections load as empty slices.
        let dwarf = Dwarf::load(|id| -> Result<Slice<'d>, Error> {
            Ok(Slice::new(
                elf.section(id.name()).unwrap_or_default(),
                gimli::LittleEndian,
            ))
        })?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|e| Error::with_source(ErrorKind::CannotParseDwarf, "failed to parse unit header", e))?
        {
            let offset = header
                .offset()
                .as_debug_info_offset()
                .map(|o| o.0)
                .unwrap_or_default();
            let unit = dwarf.unit(header).map_err(|e| {
                Error::with_source(
                    ErrorKind::CannotParseDwarf,
                    format!("failed to parse compilation unit at offset {offset:#x}"),
                    e,
                )
            })?;
            units.push(unit);
        }

        Ok(DwarfData {
            dwarf,
            units,
            has_debug_line: elf.has_section(".debug_line"),
        })
    }

    /// Creates a fresh decoding cursor for every compilation unit.
    pub fn unit_states(&self) -> Result<Vec<UnitState>, Error> {
        self.units
            .iter()
            .enumerate()
            .map(|(index, unit)| UnitState::new(index, unit))
            .collect()
    }
}

impl<'slf, 'd: 'slf> AsSelf<'slf> for DwarfData<'d> {
    type Ref = DwarfData<'slf>;

    fn as_self(&'slf self) -> &Self::Ref {
        // The abbreviations cache inside `gimli::Dwarf` makes the lifetime invariant.
        unsafe { std::mem::transmute(self) }
    }
}

/// The input bytes together with the DWARF context parsed from them.
pub(crate) struct DwarfImage {
    cell: SelfCell<ByteView<'static>, DwarfData<'static>>,
}

impl DwarfImage {
    /// Opens the image. Consumes the entire input and runs all non-parallel pre-work.
    pub fn parse(bytes: ByteView<'static>) -> Result<Self, Error> {
        let cell = SelfCell::try_new(bytes, |data| DwarfData::parse(unsafe { &*data }))?;
        Ok(DwarfImage { cell })
    }

    pub fn data(&self) -> &DwarfData<'_> {
        self.cell.get()
    }
}

struct StackEntry {
    offset: u64,
    tag: DwTag,
}

/// The decoding cursor of one compilation unit.
///
/// Owned by the unit queue or by exactly one worker while decoding, and dropped once all of the
/// unit's bytes have been emitted. All offsets are absolute within `.debug_info`.
pub(crate) struct UnitState {
    index: usize,
    base: u64,
    offset: u64,
    end_offset: u64,
    stack: Vec<StackEntry>,
    filename_table: Option<Arc<StringDict>>,
    filename_table_size: u64,
    unit_name: Option<Box<[u8]>>,
    line_warnings: u32,
}

impl UnitState {
    fn new(index: usize, unit: &Unit<'_>) -> Result<Self, Error> {
        let base = unit
            .header
            .offset()
            .as_debug_info_offset()
            .ok_or_else(|| Error::new(ErrorKind::Logical, "unit header outside .debug_info"))?
            .0 as u64;
        Ok(UnitState {
            index,
            base,
            offset: base + unit.header.size_of_header() as u64,
            end_offset: base + unit.header.length_including_self() as u64,
            stack: Vec::new(),
            filename_table: None,
            filename_table_size: 0,
            unit_name: None,
            line_warnings: 0,
        })
    }

    /// Whether all bytes of this unit have been decoded.
    pub fn eof(&self) -> bool {
        self.offset == self.end_offset
    }

    /// The current decoding offset, absolute within `.debug_info`.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// The value of one attribute, grouped by how it projects into the output columns.
enum Projected<'d> {
    /// A 64-bit value; raw bits for signed forms.
    Int(u64),
    /// A resolved address, 0 if it cannot be resolved.
    Address(u64),
    /// A byte block or DWARF expression.
    Bytes(&'d [u8]),
    /// A text string.
    Str(&'d [u8]),
    /// An absolute `.debug_info` offset of another entry.
    Ref(u64),
    /// No useful projection.
    None,
}

fn classify<'d>(
    dwarf: &Dwarf<'d>,
    unit: &Unit<'d>,
    base: u64,
    value: &AttributeValue<Slice<'d>>,
) -> Result<Projected<'d>, Error> {
    Ok(match value {
        AttributeValue::Data1(v) => Projected::Int(u64::from(*v)),
        AttributeValue::Data2(v) => Projected::Int(u64::from(*v)),
        AttributeValue::Data4(v) => Projected::Int(u64::from(*v)),
        AttributeValue::Data8(v) => Projected::Int(*v),
        AttributeValue::Udata(v) => Projected::Int(*v),
        AttributeValue::Sdata(v) => Projected::Int(*v as u64),
        AttributeValue::Flag(v) => Projected::Int(u64::from(*v)),
        AttributeValue::SecOffset(v) => Projected::Int(*v as u64),
        AttributeValue::DebugLineRef(o) => Projected::Int(o.0 as u64),
        AttributeValue::LocationListsRef(o) => Projected::Int(o.0 as u64),
        AttributeValue::RangeListsRef(o) => Projected::Int(o.0 as u64),
        AttributeValue::DebugLocListsIndex(i) => Projected::Int(i.0 as u64),
        AttributeValue::DebugRngListsIndex(i) => Projected::Int(i.0 as u64),
        AttributeValue::DebugAddrBase(o) => Projected::Int(o.0 as u64),
        AttributeValue::DebugStrOffsetsBase(o) => Projected::Int(o.0 as u64),
        AttributeValue::DebugLocListsBase(o) => Projected::Int(o.0 as u64),
        AttributeValue::DebugRngListsBase(o) => Projected::Int(o.0 as u64),
        AttributeValue::DebugMacinfoRef(o) => Projected::Int(o.0 as u64),
        AttributeValue::DebugMacroRef(o) => Projected::Int(o.0 as u64),
        AttributeValue::FileIndex(v) => Projected::Int(*v),
        AttributeValue::Language(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Encoding(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::DecimalSign(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Endianity(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Accessibility(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Visibility(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Virtuality(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::AddressClass(v) => Projected::Int(v.0 as u64),
        AttributeValue::IdentifierCase(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::CallingConvention(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Inline(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::Ordering(v) => Projected::Int(u64::from(v.0)),
        AttributeValue::DwoId(v) => Projected::Int(v.0),

        AttributeValue::Addr(a) => Projected::Address(*a),
        AttributeValue::DebugAddrIndex(index) => {
            Projected::Address(dwarf.address(unit, *index).unwrap_or_default())
        }

        // DW_FORM_data16 values also arrive here: gimli reads them as block data.
        AttributeValue::Block(r) => Projected::Bytes(r.slice()),
        AttributeValue::Exprloc(e) => Projected::Bytes(e.0.slice()),

        AttributeValue::String(r) => Projected::Str(r.slice()),
        AttributeValue::DebugStrRef(_)
        | AttributeValue::DebugStrRefSup(_)
        | AttributeValue::DebugStrOffsetsIndex(_)
        | AttributeValue::DebugLineStrRef(_) => {
            let resolved = dwarf.attr_string(unit, value.clone()).map_err(|e| {
                Error::with_source(ErrorKind::CannotParseDwarf, "failed to read string attribute", e)
            })?;
            Projected::Str(resolved.slice())
        }

        AttributeValue::UnitRef(offset) => Projected::Ref(base + offset.0 as u64),
        AttributeValue::DebugInfoRef(o) => Projected::Ref(o.0 as u64),
        AttributeValue::DebugInfoRefSup(o) => Projected::Ref(o.0 as u64),
        AttributeValue::DebugTypesRef(sig) => Projected::Ref(sig.0),

        _ => Projected::None,
    })
}

fn section_offset(value: &AttributeValue<Slice<'_>>) -> Option<u64> {
    match value {
        AttributeValue::SecOffset(o) => Some(*o as u64),
        AttributeValue::DebugLineRef(o) => Some(o.0 as u64),
        _ => None,
    }
}

/// Builds the filename dictionary of `unit` from the line program header at `offset`.
///
/// Index 0 is the empty string; DWARF version 4 and earlier number files from 1, so another
/// empty entry is reserved before the real filenames.
fn parse_filename_table<'d>(
    data: &DwarfData<'d>,
    gimli_unit: &Unit<'d>,
    unit: &mut UnitState,
    offset: u64,
) -> Result<(), Error> {
    if !data.has_debug_line {
        return Err(Error::new(
            ErrorKind::CannotParseDwarf,
            "unit has a DW_AT_stmt_list attribute but there is no .debug_line section",
        ));
    }

    let program = data
        .dwarf
        .debug_line
        .program(
            DebugLineOffset(offset as usize),
            gimli_unit.header.address_size(),
            gimli_unit.comp_dir,
            gimli_unit.name,
        )
        .map_err(|e| {
            Error::with_source(
                ErrorKind::CannotParseDwarf,
                format!("failed to parse line program header at offset {offset:#x}"),
                e,
            )
        })?;
    let header = program.header();

    let mut entries: Vec<Box<[u8]>> = Vec::with_capacity(header.file_names().len() + 2);
    entries.push(Box::default());
    if header.version() <= 4 {
        entries.push(Box::default());
    }
    for file in header.file_names() {
        let name = match data.dwarf.attr_string(gimli_unit, file.path_name()) {
            Ok(resolved) => Box::from(resolved.slice()),
            Err(err) => {
                unit.line_warnings += 1;
                if unit.line_warnings <= MAX_LINE_WARNINGS {
                    tracing::warn!(
                        unit = unit.index,
                        error = %err,
                        "unreadable filename in line program header"
                    );
                }
                Box::from(&b"<error>"[..])
            }
        };
        entries.push(name);
    }

    unit.filename_table_size = entries.len() as u64 - 1;
    unit.filename_table = Some(Arc::new(StringDict::new(entries)));
    Ok(())
}

#[derive(Default)]
struct ChunkBuilder {
    offset: Vec<u64>,
    size: Vec<u32>,
    tag: Vec<u32>,
    ancestor_tags: Vec<u32>,
    ancestor_dwarf_offsets: Vec<u64>,
    ancestor_array_offsets: Vec<u64>,
    name: Vec<Box<[u8]>>,
    linkage_name: Vec<Box<[u8]>>,
    decl_file: Vec<u32>,
    decl_line: Vec<u32>,
    attr_name: Vec<u32>,
    attr_form: Vec<u32>,
    attr_int: Vec<u64>,
    attr_str: Vec<u32>,
    attr_str_dict: DictBuilder,
    attr_array_offsets: Vec<u64>,
}

impl ChunkBuilder {
    fn new() -> Self {
        ChunkBuilder::default()
    }

    fn push_attr_str(&mut self, value: &[u8]) {
        let index = self.attr_str_dict.intern(value);
        self.attr_str.push(index);
    }

    fn push_attr_str_default(&mut self) {
        self.attr_str.push(0);
    }

    fn finish(
        mut self,
        projection: &Projection,
        registry: &DictRegistry,
        unit: &UnitState,
        num_rows: usize,
    ) -> Chunk {
        let attr_offsets = Arc::new(mem::take(&mut self.attr_array_offsets));
        let ancestor_offsets = Arc::new(mem::take(&mut self.ancestor_array_offsets));
        let attr_str_dict =
            Arc::new(mem::replace(&mut self.attr_str_dict, DictBuilder::new()).finish());

        let columns = projection
            .output()
            .iter()
            .map(|col| match col {
                DwarfColumn::Offset => Column::U64(mem::take(&mut self.offset)),
                DwarfColumn::Size => Column::U32(mem::take(&mut self.size)),
                DwarfColumn::Tag => Column::DictStr(DictStrColumn {
                    dict: registry.tags.clone(),
                    indices: mem::take(&mut self.tag),
                }),
                DwarfColumn::UnitName => {
                    let entries: Vec<Box<[u8]>> =
                        vec![Box::default(), unit.unit_name.clone().unwrap_or_default()];
                    Column::DictStr(DictStrColumn {
                        dict: Arc::new(StringDict::new(entries)),
                        indices: vec![1; num_rows],
                    })
                }
                DwarfColumn::UnitOffset => Column::DictU64(DictU64Column {
                    dict: Arc::new(vec![0, unit.base]),
                    indices: vec![1; num_rows],
                }),
                DwarfColumn::AncestorTags => Column::DictStrArray(DictStrArrayColumn {
                    values: DictStrColumn {
                        dict: registry.tags.clone(),
                        indices: mem::take(&mut self.ancestor_tags),
                    },
                    offsets: ancestor_offsets.clone(),
                }),
                DwarfColumn::AncestorOffsets => Column::U64Array(U64ArrayColumn {
                    values: mem::take(&mut self.ancestor_dwarf_offsets),
                    offsets: ancestor_offsets.clone(),
                }),
                DwarfColumn::Name => Column::Str(mem::take(&mut self.name)),
                DwarfColumn::LinkageName => Column::Str(mem::take(&mut self.linkage_name)),
                DwarfColumn::DeclFile => Column::DictStr(DictStrColumn {
                    dict: unit
                        .filename_table
                        .clone()
                        .unwrap_or_else(|| Arc::new(StringDict::empty())),
                    indices: mem::take(&mut self.decl_file),
                }),
                DwarfColumn::DeclLine => Column::U32(mem::take(&mut self.decl_line)),
                DwarfColumn::AttrName => Column::DictStrArray(DictStrArrayColumn {
                    values: DictStrColumn {
                        dict: registry.attrs.clone(),
                        indices: mem::take(&mut self.attr_name),
                    },
                    offsets: attr_offsets.clone(),
                }),
                DwarfColumn::AttrForm => Column::DictStrArray(DictStrArrayColumn {
                    values: DictStrColumn {
                        dict: registry.forms.clone(),
                        indices: mem::take(&mut self.attr_form),
                    },
                    offsets: attr_offsets.clone(),
                }),
                DwarfColumn::AttrInt => Column::U64Array(U64ArrayColumn {
                    values: mem::take(&mut self.attr_int),
                    offsets: attr_offsets.clone(),
                }),
                DwarfColumn::AttrStr => Column::DictStrArray(DictStrArrayColumn {
                    values: DictStrColumn {
                        dict: attr_str_dict.clone(),
                        indices: mem::take(&mut self.attr_str),
                    },
                    offsets: attr_offsets.clone(),
                }),
            })
            .collect();

        Chunk { columns, num_rows }
    }
}

/// Decodes up to [`MAX_ROWS_PER_CHUNK`] entries from `unit` into one chunk.
///
/// Stops early when the unit is exhausted. Mutates only the unit state, which resumes decoding
/// at the next call when the row cap was hit first.
pub(crate) fn parse_entries(
    data: &DwarfData<'_>,
    registry: &DictRegistry,
    projection: &Projection,
    unit: &mut UnitState,
) -> Result<Chunk, Error> {
    let gimli_unit = &data.units[unit.index];
    let base = unit.base;

    let need_offset = projection.needs(DwarfColumn::Offset);
    let need_size = projection.needs(DwarfColumn::Size);
    let need_tag = projection.needs(DwarfColumn::Tag);
    let need_ancestor_tags = projection.needs(DwarfColumn::AncestorTags);
    let need_ancestor_offsets = projection.needs(DwarfColumn::AncestorOffsets);
    let need_name = projection.needs(DwarfColumn::Name);
    let need_linkage_name = projection.needs(DwarfColumn::LinkageName);
    let need_decl_file = projection.needs(DwarfColumn::DeclFile);
    let need_decl_line = projection.needs(DwarfColumn::DeclLine);
    let need_attr_name = projection.needs(DwarfColumn::AttrName);
    let need_attr_form = projection.needs(DwarfColumn::AttrForm);
    let need_attr_int = projection.needs(DwarfColumn::AttrInt);
    let need_attr_str = projection.needs(DwarfColumn::AttrStr);

    let mut entries = gimli_unit
        .entries_raw(Some(UnitOffset((unit.offset - base) as usize)))
        .map_err(|e| {
            Error::with_source(
                ErrorKind::CannotParseDwarf,
                format!("failed to position entry cursor at offset {:#x}", unit.offset),
                e,
            )
        })?;

    let mut builder = ChunkBuilder::new();
    let mut num_rows = 0usize;

    while num_rows < MAX_ROWS_PER_CHUNK {
        num_rows += 1;
        let die_offset = base + entries.next_offset().0 as u64;
        if need_offset {
            builder.offset.push(die_offset);
        }
        if need_ancestor_tags {
            for entry in unit.stack.iter().rev() {
                builder.ancestor_tags.push(u32::from(entry.tag.0));
                if need_ancestor_offsets {
                    builder.ancestor_dwarf_offsets.push(entry.offset);
                }
            }
            builder
                .ancestor_array_offsets
                .push(builder.ancestor_tags.len() as u64);
        }

        let abbrev = entries.read_abbreviation().map_err(|e| {
            Error::with_source(
                ErrorKind::CannotParseDwarf,
                format!("failed to parse entry header at offset {die_offset:#x}"),
                e,
            )
        })?;

        match abbrev {
            // Abbreviation code 0 terminates a sibling list.
            None => {
                if need_size {
                    let after = base + entries.next_offset().0 as u64;
                    builder.size.push((after - die_offset) as u32);
                }
                if need_tag {
                    builder.tag.push(0);
                }
                if need_name {
                    builder.name.push(Box::default());
                }
                if need_linkage_name {
                    builder.linkage_name.push(Box::default());
                }
                if need_decl_file {
                    builder.decl_file.push(0);
                }
                if need_decl_line {
                    builder.decl_line.push(0);
                }
                if need_attr_name {
                    builder
                        .attr_array_offsets
                        .push(builder.attr_name.len() as u64);
                }

                if unit.stack.pop().is_none() {
                    return Err(Error::new(
                        ErrorKind::CannotParseDwarf,
                        format!("stack underflow at offset {die_offset:#x}"),
                    ));
                }
            }

            Some(abbrev) => {
                let tag = abbrev.tag();
                if need_tag {
                    builder.tag.push(u32::from(tag.0));
                }

                let mut fill_name = need_name;
                let mut fill_linkage_name = need_linkage_name;
                let mut fill_decl_file = need_decl_file;
                let mut fill_decl_line = need_decl_line;

                for spec in abbrev.attributes() {
                    let attr_offset = base + entries.next_offset().0 as u64;
                    let attr = entries.read_attribute(*spec).map_err(|e| {
                        Error::with_source(
                            ErrorKind::CannotParseDwarf,
                            format!(
                                "failed to parse attribute {} of form {} at offset {attr_offset:#x}",
                                spec.name(),
                                spec.form()
                            ),
                            e,
                        )
                    })?;

                    if need_attr_name {
                        builder.attr_name.push(u32::from(spec.name().0));
                    }
                    // The declared form, not the one resolved after DW_FORM_indirect.
                    if need_attr_form {
                        builder.attr_form.push(u32::from(spec.form().0));
                    }

                    let value = attr.value();

                    // This attribute is expected before any attributes that index the table.
                    if spec.name() == constants::DW_AT_stmt_list && unit.filename_table.is_none() {
                        if let Some(line_offset) = section_offset(&value) {
                            parse_filename_table(data, gimli_unit, unit, line_offset)?;
                        }
                    }

                    match classify(&data.dwarf, gimli_unit, base, &value)? {
                        Projected::Int(raw) => {
                            if need_attr_int {
                                builder.attr_int.push(raw);
                            }
                            if spec.name() == constants::DW_AT_decl_line
                                && mem::take(&mut fill_decl_line)
                            {
                                builder.decl_line.push(raw as u32);
                            }

                            let file_attr = spec.name() == constants::DW_AT_decl_file
                                || spec.name() == constants::DW_AT_call_file;
                            if file_attr && raw < unit.filename_table_size {
                                let index = raw + 1;
                                if spec.name() == constants::DW_AT_decl_file
                                    && mem::take(&mut fill_decl_file)
                                {
                                    builder.decl_file.push(index as u32);
                                }
                                if need_attr_str {
                                    match unit.filename_table.as_ref() {
                                        Some(table) => builder.push_attr_str(table.get(index as usize)),
                                        None => builder.push_attr_str_default(),
                                    }
                                }
                            } else if need_attr_str {
                                if spec.name() == constants::DW_AT_language {
                                    builder.push_attr_str(language_name(raw));
                                } else if spec.name() == constants::DW_AT_encoding {
                                    builder.push_attr_str(encoding_name(raw));
                                } else {
                                    builder.push_attr_str_default();
                                }
                            }
                        }

                        Projected::Address(address) => {
                            if need_attr_int {
                                builder.attr_int.push(address);
                            }
                            if need_attr_str {
                                builder.push_attr_str_default();
                            }
                        }

                        Projected::Bytes(bytes) => {
                            if need_attr_str {
                                builder.push_attr_str(bytes);
                            }
                            if need_attr_int {
                                builder.attr_int.push(0);
                            }
                        }

                        Projected::Str(string) => {
                            if spec.name() == constants::DW_AT_name {
                                if mem::take(&mut fill_name) {
                                    builder.name.push(Box::from(string));
                                }
                                if tag == constants::DW_TAG_compile_unit {
                                    unit.unit_name = Some(Box::from(string));
                                }
                            }
                            if spec.name() == constants::DW_AT_linkage_name
                                && mem::take(&mut fill_linkage_name)
                            {
                                builder.linkage_name.push(Box::from(string));
                            }
                            if need_attr_str {
                                builder.push_attr_str(string);
                            }
                            if need_attr_int {
                                builder.attr_int.push(0);
                            }
                        }

                        Projected::Ref(target) => {
                            if need_attr_int {
                                builder.attr_int.push(target);
                            }
                            if need_attr_str {
                                builder.push_attr_str_default();
                            }
                        }

                        Projected::None => {
                            if need_attr_int {
                                builder.attr_int.push(0);
                            }
                            if need_attr_str {
                                builder.push_attr_str_default();
                            }
                        }
                    }
                }

                if need_size {
                    let after = base + entries.next_offset().0 as u64;
                    builder.size.push((after - die_offset) as u32);
                }
                if need_attr_name {
                    builder
                        .attr_array_offsets
                        .push(builder.attr_name.len() as u64);
                }

                if fill_name {
                    builder.name.push(Box::default());
                }
                if fill_linkage_name {
                    builder.linkage_name.push(Box::default());
                }
                if fill_decl_file {
                    builder.decl_file.push(0);
                }
                if fill_decl_line {
                    builder.decl_line.push(0);
                }

                if abbrev.has_children() {
                    unit.stack.push(StackEntry {
                        offset: die_offset,
                        tag,
                    });
                }
            }
        }

        unit.offset = base + entries.next_offset().0 as u64;

        if unit.stack.is_empty() {
            if !unit.eof() {
                return Err(Error::new(
                    ErrorKind::CannotParseDwarf,
                    format!(
                        "unexpected end of DIE tree at offset {:#x} != {:#x}",
                        unit.offset, unit.end_offset
                    ),
                ));
            }
            break;
        }
    }

    Ok(builder.finish(projection, registry, unit, num_rows))
}
