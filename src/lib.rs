//! Incremental `multipart/form-data` decoding.
//!
//! The payload is read from a chunked byte source (any
//! `Stream<Item = Result<Bytes, E>>`, a tokio `AsyncRead` or an HTTP body)
//! and split into parts as the chunks arrive. Bodies are never buffered as a
//! whole unless asked for.
//!
//! ```
//! use bytes::Bytes;
//! use futures::{executor::block_on, stream};
//!
//! let payload = "--xyz\r\n\
//!     Content-Disposition: form-data; name=\"greeting\"\r\n\r\n\
//!     hello\r\n--xyz--\r\n";
//! let chunks: Vec<_> = payload
//!     .as_bytes()
//!     .chunks(4)
//!     .map(|c| Ok::<_, std::io::Error>(Bytes::copy_from_slice(c)))
//!     .collect();
//!
//! let parts = block_on(multipart_wire::parse_multipart(stream::iter(chunks), "xyz")).unwrap();
//! assert_eq!(parts.len(), 1);
//! assert_eq!(parts[0].name, "greeting");
//! assert_eq!(&parts[0].data[..], b"hello");
//! ```

use bytes::Bytes;
use futures::{Stream, TryStreamExt};

pub mod config;
pub mod error;
pub mod header;
pub mod source;

mod body;
mod header_block;
mod multipart;
mod part;
mod search;

pub use body::PartBody;
pub use config::Config;
pub use error::{BoxError, Error, Result};
pub use multipart::Multipart;
pub use part::{FullPart, Part, PartHeaders, StreamingPart};

/// Streams the parts of `source`; each part's body is itself streamed.
pub fn stream_multipart<S>(source: S, boundary: &str) -> Multipart<S> {
    Multipart::new(source, boundary)
}

/// Streams the parts of `source`, reading each body into memory before the
/// part is yielded.
pub fn iterate_multipart<S, E>(
    source: S,
    boundary: &str,
) -> impl Stream<Item = Result<FullPart>> + use<S, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    Multipart::new(source, boundary).and_then(|part| part.into_full())
}

/// Reads every part of `source` into memory.
pub async fn parse_multipart<S, E>(source: S, boundary: &str) -> Result<Vec<FullPart>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    iterate_multipart(source, boundary).try_collect().await
}
