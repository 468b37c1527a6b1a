use miette::Diagnostic;
use thiserror::Error;

/// Result type for optimizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error types for the module optimizer
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum Error {
    #[error("I/O error: {0}")]
    #[diagnostic(code(const_hoist::io_error))]
    Io(String),

    #[error("Parse error at line {line}: {message}")]
    #[diagnostic(code(const_hoist::parse_error))]
    Parse { line: usize, message: String },

    #[error("Unknown symbol: @{name}")]
    #[diagnostic(code(const_hoist::unknown_symbol))]
    UnknownSymbol { name: String },

    #[error("Type error: {message}")]
    #[diagnostic(code(const_hoist::type_error))]
    Type { message: String },

    #[error("Internal invariant violation: {message}")]
    #[diagnostic(code(const_hoist::internal_error))]
    Internal { message: String },
}

impl Error {
    /// Create a parse error at a given source line
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an internal invariant violation error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
