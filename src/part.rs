use bytes::Bytes;

use crate::body::PartBody;

/// One field of a multipart payload.
///
/// `D` is the body: a lazy [`PartBody`] stream for [`StreamingPart`], or the
/// whole body as [`Bytes`] for [`FullPart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<D> {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: D,
}

/// A part whose body is still to be pulled from the source.
pub type StreamingPart<S> = Part<PartBody<S>>;

/// A part whose body has been read into memory.
pub type FullPart = Part<Bytes>;

impl<D> Part<D> {
    /// Returns `true` if the part carried a filename, i.e. it is an upload.
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Replaces the body, keeping the metadata.
    pub fn map_data<T>(self, f: impl FnOnce(D) -> T) -> Part<T> {
        Part {
            name: self.name,
            filename: self.filename,
            content_type: self.content_type,
            data: f(self.data),
        }
    }
}

/// Metadata of a part, as read from its header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl PartHeaders {
    pub fn with_data<D>(self, data: D) -> Part<D> {
        Part {
            name: self.name,
            filename: self.filename,
            content_type: self.content_type,
            data,
        }
    }
}
