//! Reference plugins shipped with the interpreter.

pub mod dump;
pub mod overseer;

pub use dump::MemoryDump;
pub use overseer::MemOverseer;
