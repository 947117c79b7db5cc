//! Part body decoding.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};
use parking_lot::Mutex;

use crate::error::{BoxError, Error, Result};
use crate::header_block::CRLF;
use crate::multipart::Shared;
use crate::search::{StreamSearch, Token};

/// Splits the boundary-search tokens of one part body from the framing.
///
/// Every body ends with the CRLF that precedes the next boundary. A CRLF is
/// therefore held back until the following token shows whether it is data or
/// framing.
pub(crate) struct BodyDecoder {
    crlf: StreamSearch,
    trailing_crlf: bool,
}

impl BodyDecoder {
    /// Creates a decoder and returns the body bytes already found in
    /// `leftover`.
    pub(crate) fn new(leftover: Bytes) -> (Self, Bytes) {
        let mut decoder = Self {
            crlf: StreamSearch::new(CRLF),
            trailing_crlf: false,
        };
        let first = decoder.feed(leftover);
        (decoder, first)
    }

    /// Feeds the next boundary-search token; `None` is the end of the source.
    ///
    /// Returns body bytes (possibly empty), or `None` once the boundary that
    /// closes the body has been reached.
    pub(crate) fn push(&mut self, token: Option<Token>, needle: &Bytes) -> Result<Option<Bytes>> {
        match token {
            None => Err(Error::UnexpectedEof),
            Some(Token::Literal(bytes)) => Ok(Some(self.feed(bytes))),
            Some(Token::Match) if self.trailing_crlf && self.crlf.is_idle() => Ok(None),
            // Not preceded by a line break: the boundary text is data.
            Some(Token::Match) => Ok(Some(self.feed(needle.clone()))),
        }
    }

    fn feed(&mut self, chunk: Bytes) -> Bytes {
        let mut pieces = Vec::new();
        for token in self.crlf.feed(chunk) {
            if self.trailing_crlf {
                pieces.push(Bytes::from_static(CRLF));
            }
            match token {
                Token::Match => self.trailing_crlf = true,
                Token::Literal(bytes) => {
                    self.trailing_crlf = false;
                    pieces.push(bytes);
                }
            }
        }
        concat(pieces)
    }
}

fn concat(mut pieces: Vec<Bytes>) -> Bytes {
    match pieces.len() {
        0 => Bytes::new(),
        1 => pieces.swap_remove(0),
        _ => {
            let mut out = BytesMut::with_capacity(pieces.iter().map(Bytes::len).sum());
            for piece in &pieces {
                out.extend_from_slice(piece);
            }
            out.freeze()
        }
    }
}

/// The body of a [`StreamingPart`](crate::StreamingPart), pulled from the
/// source on demand.
///
/// The stream ends at the boundary that closes the part. Once the
/// [`Multipart`](crate::Multipart) stream has moved on to a later part, the
/// remaining body has been discarded and this stream yields `None`.
pub struct PartBody<S> {
    shared: Arc<Mutex<Shared<S>>>,
    index: usize,
    done: bool,
}

impl<S> PartBody<S> {
    pub(crate) fn new(shared: Arc<Mutex<Shared<S>>>, index: usize) -> Self {
        Self {
            shared,
            index,
            done: false,
        }
    }
}

impl<S, E> PartBody<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    /// Reads the rest of the body into memory.
    pub async fn bytes(self) -> Result<Bytes> {
        let body = self
            .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        Ok(body.freeze())
    }
}

impl<S, E> Stream for PartBody<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let polled = self.shared.lock().poll_body(cx, self.index);
        if let Poll::Ready(None) | Poll::Ready(Some(Err(_))) = polled {
            self.done = true;
        }
        polled
    }
}

impl<S> fmt::Debug for PartBody<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartBody")
            .field("index", &self.index)
            .field("done", &self.done)
            .finish()
    }
}
