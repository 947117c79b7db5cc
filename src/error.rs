//! Error types for multipart decoding.

/// Boxed error produced by a byte source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while decoding a `multipart/form-data` stream.
///
/// Every error is fatal: the source is forward-only, so once an error is
/// returned the stream yields no further parts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying byte source failed.
    #[error("byte source error: {0}")]
    Source(#[source] BoxError),

    /// The source ended inside a header block or a part body.
    #[error("malformed multipart data: unexpected end of stream")]
    UnexpectedEof,

    /// A boundary showed up at the start of a header line.
    #[error("malformed multipart data: unexpected boundary")]
    UnexpectedBoundary,

    /// A header line without a `:` separator.
    #[error("malformed multipart header: missing colon in `{0}`")]
    MissingColon(String),

    /// A part without a `Content-Disposition` header.
    #[error("malformed multipart header: missing content-disposition")]
    MissingContentDisposition,

    /// The disposition type is not `form-data`.
    #[error("malformed content-disposition header: missing \"form-data\" in `{0}`")]
    MissingFormData(String),

    /// No (or an empty) `name` parameter.
    #[error("malformed content-disposition header: missing field name in `{0}`")]
    MissingName(String),

    /// A parameter without `=`.
    #[error("malformed key-value string: missing value in `{0}`")]
    MissingValue(String),

    /// A parameter value quoted on one side only.
    #[error("malformed key-value string: mismatched quotations in `{0}`")]
    MismatchedQuotes(String),

    /// The header block of a part exceeded the configured limit.
    #[error("multipart header block exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },

    /// The body of a part exceeded the configured limit.
    #[error("multipart part `{name}` exceeds {limit} bytes")]
    PartTooLarge { name: String, limit: u64 },

    /// The payload holds more parts than the configured limit.
    #[error("multipart payload exceeds {limit} parts")]
    TooManyParts { limit: usize },
}

impl Error {
    /// Returns `true` when the payload itself is at fault rather than the
    /// byte source, i.e. the error maps to a client error at the HTTP layer.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Error::Source(_))
    }
}
