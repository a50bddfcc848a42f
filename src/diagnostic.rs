//! Coordinate-prefixed diagnostics with caret-underlined source spans.

use std::fmt;

use thiserror::Error;

use crate::consts::{MAX_FILENAME_LENGTH, MAX_IDENT_LENGTH, PROGRAM_TEXT_SIZE, Word};

/// A 0-indexed (row, col) position within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

/// A span of source text a token occupies, used to underline diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub file: String,
    pub start: Position,
    /// Exclusive end column on the same row as `start`.
    pub end_col: usize,
    pub line: String,
}

/// Errors the translator can report. Variant names are stable identifiers
/// used by tests and by `Display`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("empty label")]
    EmptyLabel,
    #[error("label redefinition")]
    LabelRedefinition,
    #[error("keyword redefinition")]
    KeywordRedefinition,
    #[error("identifier too long (limit is {MAX_IDENT_LENGTH})")]
    IdentTooLong,
    #[error("ident used but never defined")]
    UnknownIdent,
    #[error("number constant exceeds 32-bit limit ({})", Word::MAX)]
    NumberTooBig,
    #[error("unable to read file")]
    CantReadFile,
    #[error("file size is too big (limit is {} KiB)", PROGRAM_TEXT_SIZE / 1024)]
    ProgramTooLong,
    #[error("filename is too long (limit is {MAX_FILENAME_LENGTH})")]
    FilenameTooLong,
    #[error("too many idents")]
    TooManyIdents,
}

impl TranslateError {
    /// Whether this error carries a source location that can be underlined.
    pub const fn is_located(&self) -> bool {
        !matches!(
            self,
            Self::CantReadFile | Self::ProgramTooLong | Self::FilenameTooLong | Self::TooManyIdents
        )
    }
}

/// A translator error together with the location it was raised at, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: TranslateError,
    pub span: Option<SourceSpan>,
}

impl Diagnostic {
    pub fn located(error: TranslateError, span: SourceSpan) -> Self {
        Self { error, span: Some(span) }
    }

    pub fn global(error: TranslateError) -> Self {
        Self { error, span: None }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => {
                writeln!(
                    f,
                    "{}:{}:{}: error: {}",
                    span.file,
                    span.start.row + 1,
                    span.start.col + 1,
                    self.error
                )?;
                writeln!(f, "{:>5} | {}", span.start.row + 1, span.line)?;
                let underline_len = span.end_col.saturating_sub(span.start.col).max(1);
                write!(f, "      | {}{}", " ".repeat(span.start.col), "^".to_string() + &"~".repeat(underline_len - 1))
            }
            None => write!(f, "error: {}", self.error),
        }
    }
}

impl std::error::Error for Diagnostic {}
