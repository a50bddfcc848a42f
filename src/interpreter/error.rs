//! Errors the running interpreter can raise.

use thiserror::Error;

use crate::consts::Word;

/// A fatal runtime condition: execution stops immediately and the driver
/// exits with `-1`, as `spec.md` §4.3/§7 require.
#[derive(Debug, Error)]
pub enum RunError {
    /// `M[IP]` held a negative value that doesn't match any known opcode.
    #[error("unknown instruction with code {0}")]
    UnknownOpcode(Word),
    /// A registered plugin's init hook reported failure.
    #[error("plugin \"{0}\" failed to initialize")]
    PluginInitFailed(String),
    /// More plugins were registered than `N_MAX_PLUGINS` allows.
    #[error("too many plugins")]
    TooManyPlugins,
    /// Division or modulo by zero; the spec leaves this open and recommends
    /// trapping rather than producing an unspecified result.
    #[error("division by zero")]
    DivisionByZero,
    /// I/O failure while reading from or writing to the host streams.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
