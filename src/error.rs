use thiserror::Error;

/// Errors produced while opening, querying or rewriting an image buffer.
///
/// The five boundary operations in [`ops`](crate::ops) never surface these;
/// they are available through the `try_*` methods on
/// [`Dispatcher`](crate::ops::Dispatcher).
#[derive(Debug, Error)]
pub enum Error {
    /// The buffer does not start with a recognized container signature.
    #[error("unsupported image format")]
    UnsupportedFormat,

    /// The container signature matched but its structure could not be parsed.
    #[error("corrupt {format} data: {reason}")]
    Corrupt { format: &'static str, reason: String },

    /// The key has no known namespace prefix or fails the namespace grammar.
    #[error("invalid key '{0}'")]
    InvalidKey(String),

    /// The key resolved but no entry with that key exists.
    #[error("tag not found: {0}")]
    TagNotFound(String),

    /// A value could not be rendered or parsed in the requested direction.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Committing the stores back into the container failed.
    #[error("failed to write metadata: {0}")]
    Write(String),
}

impl Error {
    pub(crate) fn corrupt(format: &'static str, reason: impl ToString) -> Self {
        Self::Corrupt {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding(reason.into())
    }

    pub(crate) fn write(reason: impl Into<String>) -> Self {
        Self::Write(reason.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Write(format!("in-memory stream: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
