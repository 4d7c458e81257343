use matches::assert_matches;

use crate::assembler::{assemble, assemble_image};
use crate::error::{AssembleError, Error};
use picovm::constants;
use picovm::Opcode;

#[test]
fn assembling_twice_yields_identical_output() {
    let source = ".set #0c000h; load %0,#5; load %1,#3; add %0,%1; halt;";
    let first = assemble(source).unwrap();
    let second = assemble(source).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0], picovm::Opcode::LoadRegImm as u8);
}

#[test]
fn assemble_output_is_rom_len_bytes() {
    let rom = assemble(".set #0c000h; halt;").unwrap();
    assert_eq!(rom.len(), constants::ROM_LEN);
    assert_eq!(rom[0], Opcode::Halt as u8);
}

#[test]
fn offset_shifts_label_address_but_not_write_head() {
    // `.offset` only biases where labels are recorded; the write head still
    // advances from wherever `.set` left it.
    let source = ".set #0; .offset #400h; foo: nop; load %0,&foo;";
    let (image, _max_len) = assemble_image(source).unwrap();

    // nop still lands at byte 0 of the working image...
    assert_eq!(image[0], Opcode::Nop as u8);
    // ...but the label recorded for that position is biased by .offset.
    assert_eq!(image[1], Opcode::LoadRegImm as u8);
    assert_eq!(image[2], 0); // register 0
    let patched = ((image[3] as u16) << 8) | image[4] as u16;
    assert_eq!(patched, 0x0400);
}

#[test]
fn s5_relocation_patches_label_word_to_resolved_address() {
    // target: .word #DEADh; load %0, &target;  — with .set 0; .offset 0, the
    // label resolves to address 0x0000, so the relocation patches the
    // trailing placeholder word back to 00 00.
    let source = ".set #0; .offset #0; target: .word #DEADh; load %0,&target;";
    let (image, _max_len) = assemble_image(source).unwrap();

    assert_eq!(&image[0..2], &[0xDE, 0xAD]);
    assert_eq!(image[2], Opcode::LoadRegImm as u8);
    assert_eq!(image[3], 0);
    assert_eq!(&image[4..6], &[0x00, 0x00]);
}

#[test]
fn unresolved_symbol_is_an_error() {
    let source = "load %0,&missing; halt;";
    assert_matches!(
        assemble(source),
        Err(Error::Assemble(AssembleError::UnresolvedSymbol { .. }))
    );
}

#[test]
fn duplicate_label_definition_is_an_error() {
    let source = "foo: nop; foo: nop; halt;";
    assert_matches!(
        assemble(source),
        Err(Error::Assemble(AssembleError::DuplicateSymbol { .. }))
    );
}

#[test]
fn comma_separated_operands_match_the_two_register_variant() {
    let rom = assemble(".set #0c000h; add %1,%2; halt;").unwrap();
    assert_eq!(rom[0], Opcode::AddRegReg as u8);
    assert_eq!(rom[1], (1 << 4) | 2);
}

#[test]
fn dual_register_operands_pack_into_a_single_byte() {
    let rom = assemble(".set #0c000h; load %3,%7; halt;").unwrap();
    assert_eq!(rom[0], Opcode::LoadRegReg as u8);
    assert_eq!(rom[1], (3 << 4) | 7);
}

#[test]
fn directives_emit_bytes_words_and_strings() {
    let rom = assemble(".set #0c000h; .byte #7; .word #1234h; .asciz \"hi\"; halt;").unwrap();
    assert_eq!(rom[0], 7);
    assert_eq!(&rom[1..3], &[0x12, 0x34]);
    assert_eq!(&rom[3..6], &[b'h', b'i', 0]);
    assert_eq!(rom[6], Opcode::Halt as u8);
}

#[test]
fn push_and_pop_have_no_matrix_row() {
    for source in ["push %0; halt;", "pop %0; halt;"] {
        assert!(assemble(source).is_err(), "expected {:?} to be rejected", source);
    }
}

#[test]
fn words_not_tokenized_as_mnemonics_are_usable_as_bare_label_references() {
    // swap/not/or/and/xor/calldyn aren't keywords, so a bare, unprefixed use
    // of one of these words lexes as an ordinary label reference (the
    // lexer's "bare identifier not followed by `:`" rule) rather than as a
    // mnemonic token, same as the upstream lexer.
    for name in ["swap", "not", "or", "and", "xor", "calldyn"] {
        let source = format!(".set #0c000h; {}: nop; load %0,{}; halt;", name, name);
        assert!(assemble(&source).is_ok(), "expected label {:?} to assemble", name);
    }
}
