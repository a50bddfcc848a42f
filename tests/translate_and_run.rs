use std::io::{Cursor, Write};

use tempfile::NamedTempFile;

use tinyvm::prelude::*;

fn source(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp source file");
    f.write_all(contents.as_bytes()).expect("write temp source file");
    f
}

fn run(contents: &str, stdin: &[u8]) -> Result<(Word, Vec<u8>), RunError> {
    let f = source(contents);
    let outcome = translate_files(&[f.path()]);
    assert!(!outcome.has_errors(), "unexpected translation errors: {:?}", outcome.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>());

    let mut interpreter = Interpreter::new(outcome.image);
    let mut host = PluginHost::new();
    let mut input = Cursor::new(stdin.to_vec());
    let mut output = Vec::new();
    let result = interpreter.run(RunOptions::default(), &mut host, &mut input, &mut output)?;
    Ok((result, output))
}

#[test]
fn call_ret2_setrv_subroutine_doubles_its_argument() {
    // CALL leaves [return_ip, arg] on the stack; the callee peeks the
    // argument with OVER (leaving it in place for RET2 to drop), computes
    // into RV, and RET2 pops the return address plus that argument slot.
    let program = "10 sub CALL GETRV HALT :sub OVER DUP ADD SETRV RET2";
    let (result, _) = run(program, b"").unwrap();
    assert_eq!(result, 20);
}

#[test]
fn halts_with_arithmetic_result() {
    let (result, _) = run("3 4 ADD 2 MUL HALT", b"").unwrap();
    assert_eq!(result, 14);
}

#[test]
fn memoverseer_plugin_runs_without_aborting_a_well_behaved_program() {
    let f = source("1 2 ADD HALT");
    let outcome = translate_files(&[f.path()]);
    assert!(!outcome.has_errors());

    let mut interpreter = Interpreter::new(outcome.image);
    let mut host = PluginHost::new();
    host.register(Box::new(MemOverseer::new())).unwrap();
    let mut input = Cursor::new(Vec::<u8>::new());
    let mut output = Vec::new();
    let result = interpreter.run(RunOptions::default(), &mut host, &mut input, &mut output).unwrap();
    assert_eq!(result, 3);
}

#[test]
fn memorydump_plugin_runs_without_aborting() {
    let f = source("7 HALT");
    let outcome = translate_files(&[f.path()]);
    assert!(!outcome.has_errors());

    let mut interpreter = Interpreter::new(outcome.image);
    let mut host = PluginHost::new();
    host.register(Box::new(MemoryDump::new())).unwrap();
    let mut input = Cursor::new(Vec::<u8>::new());
    let mut output = Vec::new();
    let result = interpreter.run(RunOptions::default(), &mut host, &mut input, &mut output).unwrap();
    assert_eq!(result, 7);
}

#[test]
fn translation_errors_are_collected_not_short_circuited() {
    let f = source("nosuchlabel ANOTHER_MISSING_ONE HALT");
    let outcome = translate_files(&[f.path()]);
    let unknown_ident_count = outcome.diagnostics.iter().filter(|d| d.error == TranslateError::UnknownIdent).count();
    assert_eq!(unknown_ident_count, 2, "both unknown idents should be reported, not just the first");
}

#[test]
fn division_by_zero_is_a_runtime_trap_not_a_translation_error() {
    let f = source("1 0 DIV HALT");
    let outcome = translate_files(&[f.path()]);
    assert!(!outcome.has_errors());

    let err = run("1 0 DIV HALT", b"").unwrap_err();
    assert!(matches!(err, RunError::DivisionByZero));
}

#[test]
fn echo_program_copies_stdin_byte_to_stdout() {
    let (result, out) = run("IN OUT 0 HALT", b"Q").unwrap();
    assert_eq!(result, 0);
    assert_eq!(out, b"Q");
}

#[test]
fn labels_resolve_regardless_of_definition_order() {
    let (result, _) = run("5 :skip JMP 99 HALT :skip 11 HALT", b"").unwrap();
    assert_eq!(result, 11);
}
