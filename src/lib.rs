//! A tiny stack-oriented virtual machine and its two-pass mnemonic
//! assembler.
//!
//! [`translator`] turns mnemonic source files into an [`image::Image`];
//! [`interpreter`] executes one. Hooks observing every instruction are
//! registered through [`plugin`]; [`plugins`] ships the two reference
//! observers.

pub mod consts;
pub mod diagnostic;
pub mod image;
pub mod interpreter;
pub mod lexer;
pub mod opcode;
pub mod plugin;
pub mod plugins;
pub mod symtab;
pub mod translator;

pub mod prelude {
    pub use crate::consts::Word;
    pub use crate::diagnostic::{Diagnostic, TranslateError};
    pub use crate::image::Image;
    pub use crate::interpreter::{Interpreter, RunError, RunOptions};
    pub use crate::opcode::Mnemonic;
    pub use crate::plugin::{Plugin, PluginHost, PluginInitError, VmView};
    pub use crate::plugins::{MemOverseer, MemoryDump};
    pub use crate::translator::{translate_files, TranslationOutcome};
}
