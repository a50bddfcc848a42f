//! Two-pass assembler: lexes every source file once into a combined token
//! stream, then walks that stream twice — pass 1 to resolve addresses and
//! labels, pass 2 to emit words into the [`Image`].

use std::fs;
use std::path::Path;

use crate::consts::{MAX_FILENAME_LENGTH, PROGRAM_TEXT_SIZE, PROGRAM_SIZE_IDENT, RESERVED, Word};
use crate::diagnostic::{Diagnostic, Position, SourceSpan, TranslateError};
use crate::image::{Coord, FileId, Image};
use crate::lexer::{Lexer, Token};
use crate::opcode::Mnemonic;
use crate::symtab::{IdentInfo, SymbolTable};

/// One lexed token plus enough context to render a diagnostic against it.
struct TaggedToken {
    file: FileId,
    file_name: String,
    line: String,
    token: Token,
}

/// Result of translating a sequence of source files: the (possibly partial)
/// image, and every diagnostic raised along the way. Non-empty diagnostics
/// means the image must not be executed.
pub struct TranslationOutcome {
    pub image: Image,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationOutcome {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

fn seed_keywords(symtab: &mut SymbolTable) {
    // Ignore the impossible capacity error throughout: the mnemonic table
    // (plus its handful of aliases) is far smaller than MAX_N_IDENT.
    for mnemonic in Mnemonic::all() {
        let _ = symtab.insert(
            mnemonic.name(),
            IdentInfo {
                address: mnemonic.opcode(),
                is_user_defined: false,
                position: Position::default(),
            },
        );
    }
    for &(name, aliased) in Mnemonic::ALIASES {
        let _ = symtab.insert(
            name,
            IdentInfo {
                address: aliased.opcode(),
                is_user_defined: false,
                position: Position::default(),
            },
        );
    }
}

fn span_for(tok: &TaggedToken, pos: Position, end_col: usize) -> SourceSpan {
    SourceSpan {
        file: tok.file_name.clone(),
        start: pos,
        end_col,
        line: tok.line.clone(),
    }
}

fn token_end_col(token: &Token) -> usize {
    let (start_col, len) = match token {
        Token::Label { name, pos } => (pos.col, name.len() + 1),
        Token::Number { text, pos } => (pos.col, text.len()),
        Token::Ident { name, pos } => (pos.col, name.len()),
    };
    start_col + len
}

/// Translates `paths` in order, sharing one symbol table and emission
/// cursor across all of them.
pub fn translate_files<P: AsRef<Path>>(paths: &[P]) -> TranslationOutcome {
    let mut image = Image::new();
    let mut symtab = SymbolTable::new();
    seed_keywords(&mut symtab);

    let mut diagnostics = Vec::new();
    let mut tokens: Vec<TaggedToken> = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let display_name = path.to_string_lossy().into_owned();
        if display_name.len() > MAX_FILENAME_LENGTH {
            diagnostics.push(Diagnostic::global(TranslateError::FilenameTooLong));
            continue;
        }
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(_) => {
                diagnostics.push(Diagnostic::global(TranslateError::CantReadFile));
                continue;
            }
        };
        if bytes.len() > PROGRAM_TEXT_SIZE {
            diagnostics.push(Diagnostic::global(TranslateError::ProgramTooLong));
            continue;
        }

        let file_id = image.intern_file(&display_name);
        let mut lexer = Lexer::new(&bytes);
        loop {
            let start_pos = lexer.position();
            match lexer.next_token() {
                None => break,
                Some(Ok(token)) => {
                    let line = lexer.line_at(token.pos().row);
                    tokens.push(TaggedToken { file: file_id, file_name: display_name.clone(), line, token });
                }
                Some(Err(err)) => {
                    let line = lexer.line_at(start_pos.row);
                    diagnostics.push(Diagnostic::located(
                        err,
                        SourceSpan { file: display_name.clone(), start: start_pos, end_col: start_pos.col + 1, line },
                    ));
                    // Skip to the next whitespace before resuming, so a
                    // malformed token's trailing bytes aren't re-tokenized
                    // as a spurious new token (spec.md §4.2/§7 recovery).
                    lexer.recover_to_whitespace();
                }
            }
        }
    }

    let mut current = RESERVED;
    for tok in &tokens {
        match &tok.token {
            Token::Label { name, pos } => {
                if let Some(existing) = symtab.get(name) {
                    let err = if existing.is_user_defined { TranslateError::LabelRedefinition } else { TranslateError::KeywordRedefinition };
                    diagnostics.push(Diagnostic::located(err, span_for(tok, *pos, pos.col + name.len() + 1)));
                    continue;
                }
                let info = IdentInfo { address: current as Word, is_user_defined: true, position: *pos };
                if symtab.insert(name, info).is_err() {
                    diagnostics.push(Diagnostic::global(TranslateError::TooManyIdents));
                    return TranslationOutcome { image, diagnostics };
                }
            }
            Token::Number { .. } | Token::Ident { .. } => {
                current += 1;
            }
        }
    }
    let _ = symtab.insert(
        PROGRAM_SIZE_IDENT,
        IdentInfo { address: current as Word, is_user_defined: false, position: Position::default() },
    );
    image.program_size = current;

    if diagnostics.iter().any(|d| d.error == TranslateError::TooManyIdents) {
        return TranslationOutcome { image, diagnostics };
    }

    let mut current = RESERVED;
    for tok in &tokens {
        match &tok.token {
            Token::Label { .. } => {}
            Token::Number { text, pos } => {
                let end_col = token_end_col(&tok.token);
                match parse_number(text) {
                    Ok(value) => {
                        image.write(current, value);
                        image.set_coord(current, Coord { file: tok.file, position: *pos });
                    }
                    Err(err) => {
                        diagnostics.push(Diagnostic::located(err, span_for(tok, *pos, end_col)));
                    }
                }
                current += 1;
            }
            Token::Ident { name, pos } => {
                let end_col = token_end_col(&tok.token);
                match symtab.get(name) {
                    Some(entry) => {
                        image.write(current, entry.address);
                        image.set_coord(current, Coord { file: tok.file, position: *pos });
                    }
                    None => {
                        diagnostics.push(Diagnostic::located(TranslateError::UnknownIdent, span_for(tok, *pos, end_col)));
                    }
                }
                current += 1;
            }
        }
    }
    debug_assert_eq!(current, image.program_size);

    TranslationOutcome { image, diagnostics }
}

/// Parses a decimal literal (optional leading `+`/`-`) into a [`Word`],
/// rejecting magnitudes that don't fit signed 32 bits. `-2147483648` is
/// accepted even though its magnitude (2147483648) overflows `i32`.
fn parse_number(text: &str) -> Result<Word, TranslateError> {
    let (neg, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let limit: u64 = if neg { 1u64 << 31 } else { (1u64 << 31) - 1 };
    let mut magnitude: u64 = 0;
    for d in digits.bytes() {
        let digit = (d - b'0') as u64;
        magnitude = magnitude.checked_mul(10).and_then(|m| m.checked_add(digit)).ok_or(TranslateError::NumberTooBig)?;
        if magnitude > limit {
            return Err(TranslateError::NumberTooBig);
        }
    }
    let value = if neg { -(magnitude as i64) } else { magnitude as i64 };
    Ok(value as Word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn empty_source_yields_program_size_reserved() {
        let f = write_temp("");
        let out = translate_files(&[f.path()]);
        assert!(!out.has_errors());
        assert_eq!(out.image.program_size, RESERVED);
    }

    #[test]
    fn labels_alone_emit_zero_words() {
        let f = write_temp(":a :b :c");
        let out = translate_files(&[f.path()]);
        assert!(!out.has_errors());
        assert_eq!(out.image.program_size, RESERVED);
    }

    #[test]
    fn push_and_halt_translates() {
        let f = write_temp("42 HALT");
        let out = translate_files(&[f.path()]);
        assert!(!out.has_errors());
        assert_eq!(out.image.read(RESERVED), 42);
        assert_eq!(out.image.read(RESERVED + 1), Mnemonic::Halt.opcode());
        assert_eq!(out.image.program_size, RESERVED + 2);
    }

    #[test]
    fn forward_label_reference_resolves() {
        let f = write_temp("5 :skip JMP 99 HALT :skip 7 HALT");
        let out = translate_files(&[f.path()]);
        assert!(!out.has_errors());
    }

    #[test]
    fn min_i32_literal_translates() {
        let f = write_temp("-2147483648 HALT");
        let out = translate_files(&[f.path()]);
        assert!(!out.has_errors());
        assert_eq!(out.image.read(RESERVED), i32::MIN);
    }

    #[test]
    fn overflowing_literal_is_rejected() {
        let f = write_temp("2147483648 HALT");
        let out = translate_files(&[f.path()]);
        assert!(out.diagnostics.iter().any(|d| d.error == TranslateError::NumberTooBig));
    }

    #[test]
    fn unknown_ident_is_rejected() {
        let f = write_temp("nosuchlabel HALT");
        let out = translate_files(&[f.path()]);
        assert!(out.diagnostics.iter().any(|d| d.error == TranslateError::UnknownIdent));
    }

    #[test]
    fn label_redefinition_is_rejected() {
        let f = write_temp(":a 1 :a HALT");
        let out = translate_files(&[f.path()]);
        assert!(out.diagnostics.iter().any(|d| d.error == TranslateError::LabelRedefinition));
    }

    #[test]
    fn keyword_redefinition_is_rejected() {
        let f = write_temp(":ADD 1 HALT");
        let out = translate_files(&[f.path()]);
        assert!(out.diagnostics.iter().any(|d| d.error == TranslateError::KeywordRedefinition));
    }

    #[test]
    fn overlong_ident_does_not_cascade_into_a_second_token() {
        // 70 letters with no internal whitespace: the lexer raises
        // IdentTooLong at byte 64 and must skip the remaining 6 bytes
        // rather than re-tokenizing them as a fresh (unknown) identifier.
        let long = "a".repeat(70);
        let f = write_temp(&format!("{long} HALT"));
        let out = translate_files(&[f.path()]);
        assert_eq!(out.diagnostics.iter().filter(|d| d.error == TranslateError::IdentTooLong).count(), 1);
        assert_eq!(out.diagnostics.len(), 1, "{:?}", out.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn disallowed_character_mid_token_does_not_cascade() {
        // Without skip-to-whitespace recovery this used to raise
        // UnexpectedCharacter twice and silently emit "bar" as a real
        // UnknownIdent token.
        let f = write_temp("foo!bar HALT");
        let out = translate_files(&[f.path()]);
        assert_eq!(out.diagnostics.iter().filter(|d| d.error == TranslateError::UnexpectedCharacter).count(), 1);
        assert!(!out.diagnostics.iter().any(|d| d.error == TranslateError::UnknownIdent));
    }

    #[test]
    fn multi_file_translation_shares_symbol_table() {
        let f1 = write_temp(":shared 1 HALT");
        let f2 = write_temp("shared HALT");
        let out = translate_files(&[f1.path(), f2.path()]);
        assert!(!out.has_errors());
    }
}
