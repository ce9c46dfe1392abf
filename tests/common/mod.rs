//! Helpers shared by the integration tests.

use dwarf_table::{Chunk, Column, DwarfColumn, DwarfReader, Error, ReaderOptions};

/// Options selecting the full schema with a single decode thread.
pub fn single_threaded() -> ReaderOptions {
    ReaderOptions {
        columns: None,
        max_parsing_threads: 1,
    }
}

/// Drains the reader, panicking on errors.
pub fn read_all(reader: &mut DwarfReader) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = reader.next_chunk().unwrap() {
        chunks.push(chunk);
    }
    chunks
}

/// Drains a full-schema reader over the given image.
pub fn decode(elf: &[u8], threads: usize) -> Result<Vec<Chunk>, Error> {
    let options = ReaderOptions {
        columns: None,
        max_parsing_threads: threads,
    };
    let mut reader = DwarfReader::from_vec(elf.to_vec(), options)?;
    let mut chunks = Vec::new();
    while let Some(chunk) = reader.next_chunk()? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// The column of a full-schema chunk.
pub fn col(chunk: &Chunk, column: DwarfColumn) -> &Column {
    chunk.column(column as usize)
}

/// The string value of a dict-encoded column at `row`.
pub fn dict_str(chunk: &Chunk, column: DwarfColumn, row: usize) -> String {
    let col = col(chunk, column).as_dict_str().unwrap();
    String::from_utf8_lossy(col.value(row)).into_owned()
}

/// The string value of a plain string column at `row`.
pub fn plain_str(chunk: &Chunk, column: DwarfColumn, row: usize) -> String {
    let col = col(chunk, column).as_strs().unwrap();
    String::from_utf8_lossy(&col[row]).into_owned()
}

/// The string values of a dict-encoded array column at `row`.
pub fn dict_str_array(chunk: &Chunk, column: DwarfColumn, row: usize) -> Vec<String> {
    col(chunk, column)
        .as_dict_str_array()
        .unwrap()
        .row(row)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// The values of a `u64` array column at `row`.
pub fn u64_array(chunk: &Chunk, column: DwarfColumn, row: usize) -> Vec<u64> {
    col(chunk, column).as_u64_array().unwrap().row(row).to_vec()
}

/// Checks the structural invariants that must hold for every chunk.
pub fn check_chunk_invariants(chunk: &Chunk) {
    let rows = chunk.num_rows;
    for column in &chunk.columns {
        assert_eq!(column.len(), rows);
    }
    for row in 0..rows {
        let attrs = col(chunk, DwarfColumn::AttrName)
            .as_dict_str_array()
            .unwrap()
            .row_len(row);
        assert_eq!(
            col(chunk, DwarfColumn::AttrForm)
                .as_dict_str_array()
                .unwrap()
                .row_len(row),
            attrs
        );
        assert_eq!(u64_array(chunk, DwarfColumn::AttrInt, row).len(), attrs);
        assert_eq!(
            col(chunk, DwarfColumn::AttrStr)
                .as_dict_str_array()
                .unwrap()
                .row_len(row),
            attrs
        );

        let ancestors = col(chunk, DwarfColumn::AncestorTags)
            .as_dict_str_array()
            .unwrap()
            .row_len(row);
        assert_eq!(
            u64_array(chunk, DwarfColumn::AncestorOffsets, row).len(),
            ancestors
        );
    }
}
