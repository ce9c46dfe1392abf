//! A minimal columnar data model for delivered chunks.
//!
//! The reader materializes decoded entries into the containers defined here. Values are byte
//! strings throughout (DWARF does not guarantee UTF-8), so accessors hand out `&[u8]`.
//! Low-cardinality columns are a dictionary behind an `Arc` plus a compact index vector; the
//! dictionary of the `tag`, `attr_name` and `attr_form` columns is shared by reference across
//! every chunk. Array columns store their values flat next to a vector of cumulative end
//! offsets, and the columns of one parallel-array family physically share that vector.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An immutable dictionary of byte strings.
#[derive(PartialEq, Eq)]
pub struct StringDict {
    entries: Vec<Box<[u8]>>,
}

impl StringDict {
    /// Creates a dictionary from its entries.
    pub fn new(entries: Vec<Box<[u8]>>) -> Self {
        StringDict { entries }
    }

    /// Creates a dictionary holding only the empty string.
    pub fn empty() -> Self {
        StringDict {
            entries: vec![Box::default()],
        }
    }

    /// Returns the entry at `index`, or an empty string if out of range.
    pub fn get(&self, index: usize) -> &[u8] {
        self.entries.get(index).map(AsRef::as_ref).unwrap_or(&[])
    }

    /// The number of entries in this dictionary.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for StringDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringDict")
            .field("len()", &self.entries.len())
            .finish()
    }
}

/// Builds a deduplicated [`StringDict`] incrementally. Index 0 is the empty string.
pub(crate) struct DictBuilder {
    index: HashMap<Box<[u8]>, u32>,
    entries: Vec<Box<[u8]>>,
}

impl DictBuilder {
    pub fn new() -> Self {
        DictBuilder {
            index: HashMap::new(),
            entries: vec![Box::default()],
        }
    }

    /// Returns the index of `value`, appending it if not present yet.
    pub fn intern(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.entries.len() as u32;
        self.entries.push(Box::from(value));
        self.index.insert(Box::from(value), idx);
        idx
    }

    pub fn finish(self) -> StringDict {
        StringDict::new(self.entries)
    }
}

impl Default for DictBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A dictionary-encoded string column.
#[derive(Debug, PartialEq, Eq)]
pub struct DictStrColumn {
    /// The shared dictionary.
    pub dict: Arc<StringDict>,
    /// One dictionary index per row.
    pub indices: Vec<u32>,
}

impl DictStrColumn {
    /// Returns the string value at `row`.
    pub fn value(&self, row: usize) -> &[u8] {
        self.dict.get(self.indices[row] as usize)
    }
}

/// A dictionary-encoded `u64` column.
#[derive(Debug, PartialEq, Eq)]
pub struct DictU64Column {
    /// The shared dictionary.
    pub dict: Arc<Vec<u64>>,
    /// One dictionary index per row.
    pub indices: Vec<u32>,
}

impl DictU64Column {
    /// Returns the value at `row`.
    pub fn value(&self, row: usize) -> u64 {
        self.dict[self.indices[row] as usize]
    }
}

fn array_bounds(offsets: &[u64], row: usize) -> (usize, usize) {
    let end = offsets[row] as usize;
    let start = if row == 0 { 0 } else { offsets[row - 1] as usize };
    (start, end)
}

/// An array column of dictionary-encoded strings.
#[derive(Debug, PartialEq, Eq)]
pub struct DictStrArrayColumn {
    /// The flattened inner values.
    pub values: DictStrColumn,
    /// Cumulative end offsets, one per row, shared with the sibling columns of the family.
    pub offsets: Arc<Vec<u64>>,
}

impl DictStrArrayColumn {
    /// Returns the array at `row` as an iterator of string values.
    pub fn row(&self, row: usize) -> impl Iterator<Item = &[u8]> {
        let (start, end) = array_bounds(&self.offsets, row);
        self.values.indices[start..end]
            .iter()
            .map(|&idx| self.values.dict.get(idx as usize))
    }

    /// The number of elements in the array at `row`.
    pub fn row_len(&self, row: usize) -> usize {
        let (start, end) = array_bounds(&self.offsets, row);
        end - start
    }
}

/// An array column of `u64` values.
#[derive(Debug, PartialEq, Eq)]
pub struct U64ArrayColumn {
    /// The flattened inner values.
    pub values: Vec<u64>,
    /// Cumulative end offsets, one per row, shared with the sibling columns of the family.
    pub offsets: Arc<Vec<u64>>,
}

impl U64ArrayColumn {
    /// Returns the array at `row`.
    pub fn row(&self, row: usize) -> &[u64] {
        let (start, end) = array_bounds(&self.offsets, row);
        &self.values[start..end]
    }
}

/// A single materialized column of a [`Chunk`].
#[derive(Debug, PartialEq, Eq)]
pub enum Column {
    /// Plain unsigned 32-bit values.
    U32(Vec<u32>),
    /// Plain unsigned 64-bit values.
    U64(Vec<u64>),
    /// Plain byte strings.
    Str(Vec<Box<[u8]>>),
    /// Dictionary-encoded byte strings.
    DictStr(DictStrColumn),
    /// Dictionary-encoded unsigned 64-bit values.
    DictU64(DictU64Column),
    /// Arrays of dictionary-encoded byte strings.
    DictStrArray(DictStrArrayColumn),
    /// Arrays of unsigned 64-bit values.
    U64Array(U64ArrayColumn),
}

impl Column {
    /// The number of rows in this column.
    pub fn len(&self) -> usize {
        match self {
            Column::U32(v) => v.len(),
            Column::U64(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::DictStr(c) => c.indices.len(),
            Column::DictU64(c) => c.indices.len(),
            Column::DictStrArray(c) => c.offsets.len(),
            Column::U64Array(c) => c.offsets.len(),
        }
    }

    /// Returns `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The values of a `U32` column.
    pub fn as_u32s(&self) -> Option<&[u32]> {
        match self {
            Column::U32(v) => Some(v),
            _ => None,
        }
    }

    /// The values of a `U64` column.
    pub fn as_u64s(&self) -> Option<&[u64]> {
        match self {
            Column::U64(v) => Some(v),
            _ => None,
        }
    }

    /// The values of a `Str` column.
    pub fn as_strs(&self) -> Option<&[Box<[u8]>]> {
        match self {
            Column::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The inner column of a `DictStr` column.
    pub fn as_dict_str(&self) -> Option<&DictStrColumn> {
        match self {
            Column::DictStr(c) => Some(c),
            _ => None,
        }
    }

    /// The inner column of a `DictU64` column.
    pub fn as_dict_u64(&self) -> Option<&DictU64Column> {
        match self {
            Column::DictU64(c) => Some(c),
            _ => None,
        }
    }

    /// The inner column of a `DictStrArray` column.
    pub fn as_dict_str_array(&self) -> Option<&DictStrArrayColumn> {
        match self {
            Column::DictStrArray(c) => Some(c),
            _ => None,
        }
    }

    /// The inner column of a `U64Array` column.
    pub fn as_u64_array(&self) -> Option<&U64ArrayColumn> {
        match self {
            Column::U64Array(c) => Some(c),
            _ => None,
        }
    }
}

/// One batch of rows delivered to the consumer.
///
/// Columns appear in the order they were requested; see [`schema`](crate::schema) for the full
/// column list and [`ReaderOptions`](crate::ReaderOptions) for projections.
#[derive(Debug, PartialEq, Eq)]
pub struct Chunk {
    /// The materialized columns, in requested order.
    pub columns: Vec<Column>,
    /// The number of rows in each column.
    pub num_rows: usize,
}

impl Chunk {
    /// Returns the column at `index` in requested order.
    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }
}
