//! Streams the DWARF debugging information of an ELF image as a columnar table.
//!
//! Every row of the table is one Debugging Information Entry (DIE) from `.debug_info`, with its
//! tag, ancestry, common attributes and the full attribute list projected into a fixed set of
//! columns (see [`schema`]). Rows are delivered in batches ([`Chunk`]) pulled from a
//! [`DwarfReader`]; compilation units are decoded concurrently by a bounded worker pool with
//! back-pressure against a slow consumer.
//!
//! Low-cardinality columns are dictionary encoded. The tag, attribute-name and attribute-form
//! dictionaries are precomputed per reader and shared by reference into every chunk; filename
//! dictionaries are built per unit from the `.debug_line` prologue.
//!
//! # Example
//!
//! ```no_run
//! use dwarf_table::{DwarfReader, ReaderOptions};
//!
//! fn main() -> Result<(), dwarf_table::Error> {
//!     let options = ReaderOptions {
//!         columns: Some(vec!["offset".into(), "tag".into(), "name".into()]),
//!         max_parsing_threads: 4,
//!     };
//!     let mut reader = DwarfReader::open("./my-binary", options)?;
//!     while let Some(chunk) = reader.next_chunk()? {
//!         let tags = chunk.column(1).as_dict_str().unwrap();
//!         for row in 0..chunk.num_rows {
//!             println!("{}", String::from_utf8_lossy(tags.value(row)));
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod columns;
mod dwarf;
mod error;
mod reader;
mod registry;
mod schema;

pub mod elf;

#[doc(hidden)]
pub mod testutil;

pub use crate::columns::{
    Chunk, Column, DictStrArrayColumn, DictStrColumn, DictU64Column, StringDict, U64ArrayColumn,
};
pub use crate::error::{Error, ErrorKind};
pub use crate::reader::{DwarfReader, ReaderOptions};
pub use crate::registry::DictRegistry;
pub use crate::schema::{schema, DataType, DwarfColumn, COLUMN_COUNT, FORMAT_NAME};
