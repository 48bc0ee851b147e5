//! Error types of the benchmark library.

/// Errors that can happen while talking to the key-value service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client, including timeouts and
    /// connection failures.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// The configured base URL could not be parsed.
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The configured base URL is valid, but cannot have endpoint paths appended to it.
    #[error("base URL `{0}` cannot be used as a base")]
    CannotBeABase(String),
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
