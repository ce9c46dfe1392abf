//! The fixed output schema and column projections.

use crate::error::{Error, ErrorKind};

/// The name under which this input format is registered.
pub const FORMAT_NAME: &str = "DWARF";

/// The number of columns in the fixed schema.
pub const COLUMN_COUNT: usize = 15;

/// The columns of the fixed schema, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum DwarfColumn {
    /// Byte offset of the entry inside `.debug_info`.
    Offset,
    /// Bytes consumed by the entry, header and attributes included.
    Size,
    /// The entry tag, with the `DW_TAG_` prefix stripped; empty for null entries.
    Tag,
    /// Name of the enclosing compilation unit.
    UnitName,
    /// Offset of the enclosing compilation unit header.
    UnitOffset,
    /// Tags of the ancestor entries, innermost first.
    AncestorTags,
    /// Offsets of the ancestor entries, aligned with `AncestorTags`.
    AncestorOffsets,
    /// Value of `DW_AT_name`, or empty.
    Name,
    /// Value of `DW_AT_linkage_name`, or empty.
    LinkageName,
    /// Filename referenced by `DW_AT_decl_file`, via the unit's filename table.
    DeclFile,
    /// Value of `DW_AT_decl_line`, or 0.
    DeclLine,
    /// Attribute names, with the `DW_AT_` prefix stripped.
    AttrName,
    /// Declared attribute forms, with the `DW_FORM_` prefix stripped.
    AttrForm,
    /// Per-attribute integer projection.
    AttrInt,
    /// Per-attribute string projection.
    AttrStr,
}

/// The data type of a schema column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// Byte string.
    Str,
    /// Dictionary-encoded byte string.
    DictStr,
    /// Dictionary-encoded unsigned 64-bit integer.
    DictU64,
    /// Array of dictionary-encoded byte strings.
    DictStrArray,
    /// Array of unsigned 64-bit integers.
    U64Array,
}

impl DwarfColumn {
    /// All columns in schema order.
    pub const ALL: [DwarfColumn; COLUMN_COUNT] = [
        DwarfColumn::Offset,
        DwarfColumn::Size,
        DwarfColumn::Tag,
        DwarfColumn::UnitName,
        DwarfColumn::UnitOffset,
        DwarfColumn::AncestorTags,
        DwarfColumn::AncestorOffsets,
        DwarfColumn::Name,
        DwarfColumn::LinkageName,
        DwarfColumn::DeclFile,
        DwarfColumn::DeclLine,
        DwarfColumn::AttrName,
        DwarfColumn::AttrForm,
        DwarfColumn::AttrInt,
        DwarfColumn::AttrStr,
    ];

    /// The column name as exposed to consumers.
    pub fn name(self) -> &'static str {
        match self {
            DwarfColumn::Offset => "offset",
            DwarfColumn::Size => "size",
            DwarfColumn::Tag => "tag",
            DwarfColumn::UnitName => "unit_name",
            DwarfColumn::UnitOffset => "unit_offset",
            DwarfColumn::AncestorTags => "ancestor_tags",
            DwarfColumn::AncestorOffsets => "ancestor_offsets",
            DwarfColumn::Name => "name",
            DwarfColumn::LinkageName => "linkage_name",
            DwarfColumn::DeclFile => "decl_file",
            DwarfColumn::DeclLine => "decl_line",
            DwarfColumn::AttrName => "attr_name",
            DwarfColumn::AttrForm => "attr_form",
            DwarfColumn::AttrInt => "attr_int",
            DwarfColumn::AttrStr => "attr_str",
        }
    }

    /// The column's data type.
    pub fn data_type(self) -> DataType {
        match self {
            DwarfColumn::Offset => DataType::U64,
            DwarfColumn::Size => DataType::U32,
            DwarfColumn::Tag => DataType::DictStr,
            DwarfColumn::UnitName => DataType::DictStr,
            DwarfColumn::UnitOffset => DataType::DictU64,
            DwarfColumn::AncestorTags => DataType::DictStrArray,
            DwarfColumn::AncestorOffsets => DataType::U64Array,
            DwarfColumn::Name => DataType::Str,
            DwarfColumn::LinkageName => DataType::Str,
            DwarfColumn::DeclFile => DataType::DictStr,
            DwarfColumn::DeclLine => DataType::U32,
            DwarfColumn::AttrName => DataType::DictStrArray,
            DwarfColumn::AttrForm => DataType::DictStrArray,
            DwarfColumn::AttrInt => DataType::U64Array,
            DwarfColumn::AttrStr => DataType::DictStrArray,
        }
    }

    /// Looks a column up by its consumer-facing name.
    pub fn by_name(name: &str) -> Option<Self> {
        DwarfColumn::ALL.into_iter().find(|col| col.name() == name)
    }
}

/// Returns the fixed schema as `(name, data type)` pairs, in output order.
pub fn schema() -> impl Iterator<Item = (&'static str, DataType)> {
    DwarfColumn::ALL
        .into_iter()
        .map(|col| (col.name(), col.data_type()))
}

/// The set of columns to materialize, with the propagation rules applied.
///
/// The four attribute array columns share one offsets vector owned by `attr_name`, so requesting
/// any of them forces `attr_name` on. The same applies to the ancestry pair, owned by
/// `ancestor_tags`. Forced columns are decoded but not emitted unless also requested.
#[derive(Clone, Debug)]
pub(crate) struct Projection {
    need: [bool; COLUMN_COUNT],
    output: Vec<DwarfColumn>,
}

impl Projection {
    /// A projection of the full schema.
    pub fn all() -> Self {
        Projection {
            need: [true; COLUMN_COUNT],
            output: DwarfColumn::ALL.to_vec(),
        }
    }

    /// A projection of the named columns, in the given order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, Error> {
        let mut need = [false; COLUMN_COUNT];
        let mut output = Vec::with_capacity(names.len());
        for name in names {
            let col = DwarfColumn::by_name(name.as_ref()).ok_or_else(|| {
                Error::new(
                    ErrorKind::Logical,
                    format!("unknown column {:?} requested", name.as_ref()),
                )
            })?;
            need[col as usize] = true;
            output.push(col);
        }

        if need[DwarfColumn::AttrForm as usize]
            || need[DwarfColumn::AttrInt as usize]
            || need[DwarfColumn::AttrStr as usize]
        {
            need[DwarfColumn::AttrName as usize] = true;
        }
        if need[DwarfColumn::AncestorOffsets as usize] {
            need[DwarfColumn::AncestorTags as usize] = true;
        }

        Ok(Projection { need, output })
    }

    /// Whether `col` must be decoded.
    pub fn needs(&self, col: DwarfColumn) -> bool {
        self.need[col as usize]
    }

    /// The requested columns, in output order.
    pub fn output(&self) -> &[DwarfColumn] {
        &self.output
    }
}
