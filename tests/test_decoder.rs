//! Column semantics of the entry decoder.

use dwarf_table::testutil::{
    compile_unit_v4, compile_unit_v5, line_program_v4, line_program_v5, Abbrevs, Dies, ElfBuilder,
};
use dwarf_table::{DwarfColumn, DwarfReader, ErrorKind};
use gimli::constants;
use similar_asserts::assert_eq;

mod common;
use common::*;

fn two_die_image() -> Vec<u8> {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .start(2, constants::DW_TAG_subprogram, false)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .finish();
    let dies = Dies::new()
        .code(1)
        .string("test.c")
        .code(2)
        .string("main")
        .terminator()
        .finish();
    ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build()
}

#[test]
fn test_two_dies_and_terminator() {
    let chunks = decode(&two_die_image(), 1).unwrap();
    assert_eq!(chunks.len(), 1);
    let chunk = &chunks[0];
    assert_eq!(chunk.num_rows, 3);
    check_chunk_invariants(chunk);

    assert_eq!(dict_str(chunk, DwarfColumn::Tag, 0), "compile_unit");
    assert_eq!(dict_str(chunk, DwarfColumn::Tag, 1), "subprogram");
    assert_eq!(dict_str(chunk, DwarfColumn::Tag, 2), "");

    assert_eq!(plain_str(chunk, DwarfColumn::Name, 0), "test.c");
    assert_eq!(plain_str(chunk, DwarfColumn::Name, 1), "main");
    assert_eq!(plain_str(chunk, DwarfColumn::Name, 2), "");

    assert!(dict_str_array(chunk, DwarfColumn::AncestorTags, 0).is_empty());
    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AncestorTags, 1),
        vec!["compile_unit"]
    );
    assert!(dict_str_array(chunk, DwarfColumn::AncestorTags, 2).is_empty());

    // The root entry starts right after the 11-byte v4 unit header.
    let offsets = col(chunk, DwarfColumn::Offset).as_u64s().unwrap();
    assert_eq!(offsets[0], 11);
    assert_eq!(
        u64_array(chunk, DwarfColumn::AncestorOffsets, 1),
        vec![offsets[0]]
    );

    // Terminator rows have no attributes.
    assert_eq!(dict_str_array(chunk, DwarfColumn::AttrName, 2).len(), 0);
    assert_eq!(dict_str_array(chunk, DwarfColumn::AttrName, 0), vec!["name"]);
    assert_eq!(dict_str_array(chunk, DwarfColumn::AttrForm, 0), vec!["string"]);

    assert_eq!(dict_str(chunk, DwarfColumn::UnitName, 0), "test.c");
    assert_eq!(dict_str(chunk, DwarfColumn::UnitName, 2), "test.c");
    let unit_offsets = col(chunk, DwarfColumn::UnitOffset).as_dict_u64().unwrap();
    assert_eq!(unit_offsets.value(0), 0);
    assert_eq!(unit_offsets.value(2), 0);
}

#[test]
fn test_sizes_partition_the_unit() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .start(2, constants::DW_TAG_namespace, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .start(3, constants::DW_TAG_variable, false)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .finish();
    let dies = Dies::new()
        .code(1)
        .string("test.c")
        .code(2)
        .string("ns")
        .code(3)
        .string("x")
        .terminator()
        .terminator()
        .finish();
    let info = compile_unit_v4(0, &dies);
    let unit_len = info.len() as u64;
    let elf = ElfBuilder::new()
        .section(".debug_info", &info)
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    assert_eq!(chunk.num_rows, 5);
    check_chunk_invariants(chunk);

    let offsets = col(chunk, DwarfColumn::Offset).as_u64s().unwrap();
    let sizes = col(chunk, DwarfColumn::Size).as_u32s().unwrap();
    for row in 0..chunk.num_rows - 1 {
        assert_eq!(offsets[row] + u64::from(sizes[row]), offsets[row + 1]);
    }
    let total: u64 = sizes.iter().map(|&s| u64::from(s)).sum();
    assert_eq!(offsets[0] + total, unit_len);

    // Ancestors are listed innermost first.
    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AncestorTags, 2),
        vec!["namespace", "compile_unit"]
    );
    assert_eq!(
        u64_array(chunk, DwarfColumn::AncestorOffsets, 2),
        vec![offsets[1], offsets[0]]
    );
}

#[test]
fn test_reference_offsets_are_absolute() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .start(2, constants::DW_TAG_variable, false)
        .attr(constants::DW_AT_type, constants::DW_FORM_ref4)
        .finish();

    let first = compile_unit_v4(0, &Dies::new().code(1).string("a.c").terminator().finish());
    let second_base = first.len() as u64;
    let dies = Dies::new()
        .code(1)
        .string("b.c")
        .code(2)
        .data4(0x10)
        .terminator()
        .finish();
    let mut info = first;
    info.extend_from_slice(&compile_unit_v4(0, &dies));
    let elf = ElfBuilder::new()
        .section(".debug_info", &info)
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let all_rows: Vec<_> = chunks
        .iter()
        .flat_map(|chunk| {
            (0..chunk.num_rows).map(move |row| {
                (
                    dict_str(chunk, DwarfColumn::Tag, row),
                    u64_array(chunk, DwarfColumn::AttrInt, row),
                    col(chunk, DwarfColumn::UnitOffset).as_dict_u64().unwrap().value(row),
                )
            })
        })
        .collect();

    let variable = all_rows
        .iter()
        .find(|(tag, _, _)| tag == "variable")
        .expect("variable row");
    assert_eq!(variable.1, vec![second_base + 0x10]);
    assert_eq!(variable.2, second_base);
}

#[test]
fn test_language_and_encoding_stringified() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_language, constants::DW_FORM_udata)
        .start(2, constants::DW_TAG_base_type, false)
        .attr(constants::DW_AT_encoding, constants::DW_FORM_data1)
        .finish();
    let dies = Dies::new()
        .code(1)
        .udata(0x0004)
        .code(2)
        .data1(0x05)
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    check_chunk_invariants(chunk);

    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AttrStr, 0),
        vec!["C_plus_plus"]
    );
    assert_eq!(u64_array(chunk, DwarfColumn::AttrInt, 0), vec![0x0004]);
    assert_eq!(dict_str_array(chunk, DwarfColumn::AttrStr, 1), vec!["signed"]);
}

#[test]
fn test_decl_file_lookup_v5() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .attr(constants::DW_AT_stmt_list, constants::DW_FORM_sec_offset)
        .start(2, constants::DW_TAG_subprogram, false)
        .attr(constants::DW_AT_decl_file, constants::DW_FORM_udata)
        .attr(constants::DW_AT_decl_line, constants::DW_FORM_udata)
        .finish();
    let dies = Dies::new()
        .code(1)
        .string("a.c")
        .data4(0)
        .code(2)
        .udata(2)
        .udata(7)
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v5(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .section(".debug_line", &line_program_v5(&["a.c", "b.c", "c.c"]))
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    check_chunk_invariants(chunk);

    // File numbering is 0-based in version 5, and index 0 of the column dictionary is reserved
    // for "no file", so raw value 2 resolves to the third filename.
    assert_eq!(dict_str(chunk, DwarfColumn::DeclFile, 1), "c.c");
    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AttrStr, 1),
        vec!["c.c", ""]
    );
    let decl_lines = col(chunk, DwarfColumn::DeclLine).as_u32s().unwrap();
    assert_eq!(decl_lines, &[0u32, 7, 0][..]);
}

#[test]
fn test_decl_file_lookup_v4_is_one_based() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .attr(constants::DW_AT_stmt_list, constants::DW_FORM_sec_offset)
        .start(2, constants::DW_TAG_subprogram, false)
        .attr(constants::DW_AT_decl_file, constants::DW_FORM_udata)
        .finish();
    let dies = Dies::new()
        .code(1)
        .data4(0)
        .code(2)
        .udata(0)
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .section(".debug_line", &line_program_v4(&["a.c"]))
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];

    // Version 4 reserves file number 0 as "no file": the lookup succeeds but yields the empty
    // placeholder entry, while file number 1 is the first real filename.
    let decl_file = col(chunk, DwarfColumn::DeclFile).as_dict_str().unwrap();
    assert_eq!(decl_file.indices[1], 1);
    assert_eq!(dict_str(chunk, DwarfColumn::DeclFile, 1), "");
    assert_eq!(decl_file.dict.get(2), b"a.c");
}

#[test]
fn test_missing_stmt_list_leaves_decl_file_empty() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .start(2, constants::DW_TAG_subprogram, false)
        .attr(constants::DW_AT_decl_file, constants::DW_FORM_udata)
        .finish();
    let dies = Dies::new()
        .code(1)
        .code(2)
        .udata(1)
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    let decl_file = col(chunk, DwarfColumn::DeclFile).as_dict_str().unwrap();
    for row in 0..chunk.num_rows {
        assert_eq!(decl_file.indices[row], 0);
        assert_eq!(dict_str(chunk, DwarfColumn::DeclFile, row), "");
    }
    // Without a table the raw value cannot be stringified either.
    assert_eq!(dict_str_array(chunk, DwarfColumn::AttrStr, 1), vec![""]);
    assert_eq!(u64_array(chunk, DwarfColumn::AttrInt, 1), vec![1]);
}

#[test]
fn test_stmt_list_without_debug_line_fails() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, false)
        .attr(constants::DW_AT_stmt_list, constants::DW_FORM_sec_offset)
        .finish();
    let dies = Dies::new().code(1).data4(0).finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let mut reader = DwarfReader::from_vec(elf, single_threaded()).unwrap();
    let error = reader.next_chunk().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CannotParseDwarf);
}

#[test]
fn test_declared_form_survives_indirection() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, false)
        .attr(constants::DW_AT_const_value, constants::DW_FORM_indirect)
        .finish();
    let dies = Dies::new()
        .code(1)
        .udata(u64::from(constants::DW_FORM_udata.0))
        .udata(42)
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    assert_eq!(chunk.num_rows, 1);

    // The column records the declared form while the value follows the resolved one.
    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AttrForm, 0),
        vec!["indirect"]
    );
    assert_eq!(u64_array(chunk, DwarfColumn::AttrInt, 0), vec![42]);
}

#[test]
fn test_ref_sig8_projects_the_signature() {
    let signature: u64 = 0x1122_3344_5566_7788;
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .start(2, constants::DW_TAG_variable, false)
        .attr(constants::DW_AT_type, constants::DW_FORM_ref_sig8)
        .finish();
    let dies = Dies::new()
        .code(1)
        .code(2)
        .raw(&signature.to_le_bytes())
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AttrForm, 1),
        vec!["ref_sig8"]
    );
    assert_eq!(u64_array(chunk, DwarfColumn::AttrInt, 1), vec![signature]);
}

#[test]
fn test_data16_projects_as_block() {
    let payload: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
        0x0e, 0x0f,
    ];
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .start(2, constants::DW_TAG_variable, false)
        .attr(constants::DW_AT_const_value, constants::DW_FORM_data16)
        .finish();
    let dies = Dies::new()
        .code(1)
        .code(2)
        .raw(&payload)
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    check_chunk_invariants(chunk);

    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AttrForm, 1),
        vec!["data16"]
    );
    // The 16 raw bytes land in the string projection; the integer projection stays default.
    let attr_str = col(chunk, DwarfColumn::AttrStr)
        .as_dict_str_array()
        .unwrap();
    let values: Vec<&[u8]> = attr_str.row(1).collect();
    assert_eq!(values, vec![&payload[..]]);
    assert_eq!(u64_array(chunk, DwarfColumn::AttrInt, 1), vec![0]);
}

#[test]
fn test_first_name_wins_but_unit_name_tracks_last() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, false)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .attr(constants::DW_AT_name, constants::DW_FORM_string)
        .finish();
    let dies = Dies::new()
        .code(1)
        .string("first.c")
        .string("second.c")
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    assert_eq!(plain_str(chunk, DwarfColumn::Name, 0), "first.c");
    assert_eq!(dict_str(chunk, DwarfColumn::UnitName, 0), "second.c");
    assert_eq!(
        dict_str_array(chunk, DwarfColumn::AttrStr, 0),
        vec!["first.c", "second.c"]
    );
}

#[test]
fn test_linkage_name_and_address_and_block_projections() {
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .start(2, constants::DW_TAG_subprogram, false)
        .attr(constants::DW_AT_linkage_name, constants::DW_FORM_string)
        .attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
        .attr(constants::DW_AT_frame_base, constants::DW_FORM_exprloc)
        .finish();
    let dies = Dies::new()
        .code(1)
        .code(2)
        .string("_Zmain")
        .raw(&0x401000u64.to_le_bytes())
        .udata(2)
        .raw(&[0x91, 0x10])
        .terminator()
        .finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let chunks = decode(&elf, 1).unwrap();
    let chunk = &chunks[0];
    check_chunk_invariants(chunk);

    assert_eq!(plain_str(chunk, DwarfColumn::LinkageName, 1), "_Zmain");
    assert_eq!(
        u64_array(chunk, DwarfColumn::AttrInt, 1),
        vec![0, 0x401000, 0]
    );
    let attr_str = col(chunk, DwarfColumn::AttrStr)
        .as_dict_str_array()
        .unwrap();
    let values: Vec<&[u8]> = attr_str.row(1).collect();
    assert_eq!(values, vec![&b"_Zmain"[..], b"", &[0x91, 0x10][..]]);
}

#[test]
fn test_not_an_elf_image() {
    let mut reader =
        DwarfReader::from_vec(b"not an object file".to_vec(), single_threaded()).unwrap();
    let error = reader.next_chunk().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CannotParseElf);
}

#[test]
fn test_missing_debug_sections() {
    let elf = ElfBuilder::new().section(".debug_info", &[]).build();
    let mut reader = DwarfReader::from_vec(elf, single_threaded()).unwrap();
    let error = reader.next_chunk().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CannotParseElf);
}

#[test]
fn test_unexpected_end_of_tree() {
    // The root entry declares children but the unit ends without a terminator.
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, true)
        .finish();
    let dies = Dies::new().code(1).finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let mut reader = DwarfReader::from_vec(elf, single_threaded()).unwrap();
    let error = loop {
        match reader.next_chunk() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("expected a decode error"),
            Err(error) => break error,
        }
    };
    assert_eq!(error.kind(), ErrorKind::CannotParseDwarf);
}

#[test]
fn test_trailing_bytes_after_tree_fail() {
    // A root without children followed by a stray terminator byte.
    let abbrev = Abbrevs::new()
        .start(1, constants::DW_TAG_compile_unit, false)
        .finish();
    let dies = Dies::new().code(1).terminator().finish();
    let elf = ElfBuilder::new()
        .section(".debug_info", &compile_unit_v4(0, &dies))
        .section(".debug_abbrev", &abbrev)
        .build();

    let mut reader = DwarfReader::from_vec(elf, single_threaded()).unwrap();
    let error = loop {
        match reader.next_chunk() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("expected a decode error"),
            Err(error) => break error,
        }
    };
    assert_eq!(error.kind(), ErrorKind::CannotParseDwarf);
}
