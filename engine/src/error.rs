use thiserror::Error;

/// Errors raised while building, compressing or decoding an index.
///
/// Codec and dictionary errors abort the whole operation; there is no partially
/// compressed index.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("truncated stream: needed {needed} more bit(s), {remaining} remaining")]
    TruncatedStream { needed: usize, remaining: usize },

    #[error("corrupt dictionary: {0}")]
    CorruptDictionary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptDictionary(msg.into())
    }

    /// True for errors produced by the codec and dictionary layers (as opposed to I/O).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::TruncatedStream { .. } | Error::CorruptDictionary(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TruncatedStream { needed: 3, remaining: 1 };
        assert_eq!(err.to_string(), "truncated stream: needed 3 more bit(s), 1 remaining");

        let err = Error::corrupt("prefix longer than term");
        assert_eq!(err.to_string(), "corrupt dictionary: prefix longer than term");
    }

    #[test]
    fn test_format_errors() {
        assert!(Error::invalid("zero").is_format_error());
        assert!(!Error::Io(std::io::Error::other("disk")).is_format_error());
    }
}
