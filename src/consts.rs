//! Size and capacity constants shared by the translator and the interpreter.

use std::mem;

/// The unit of VM memory: a signed 32-bit word.
pub type Word = i32;

/// Length of a word, in bytes.
pub const WORD_SIZE: usize = mem::size_of::<Word>();

/// Total number of words in the VM's linear memory.
///
/// The spec requires at least 10^6; the canonical value is 2^21.
pub const SIZE: usize = 1 << 21;

/// Number of always-zero scratch words preceding the emitted program.
pub const RESERVED: usize = 256;

/// Maximum length, in bytes, of an identifier (label or mnemonic name).
pub const MAX_IDENT_LENGTH: usize = 63;

/// Maximum number of distinct identifiers the symbol table can hold.
pub const MAX_N_IDENT: usize = 1 << 15;

/// Maximum length, in bytes, of a source file name.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum size, in bytes, of a single source file.
pub const PROGRAM_TEXT_SIZE: usize = 8 * 1024 * 1024;

/// Maximum number of plugins that may be registered with a single run.
pub const N_MAX_PLUGINS: usize = 64;

/// Synthetic keyword inserted after pass 1 holding the first unused address.
pub const PROGRAM_SIZE_IDENT: &str = "PROGRAM_SIZE";
