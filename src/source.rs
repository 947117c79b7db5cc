//! Byte sources.
//!
//! The decoder reads any `Stream<Item = Result<Bytes, E>>`. [`ReadSource`]
//! adapts a tokio [`AsyncRead`] and [`BodySource`] adapts an HTTP body, e.g.
//! `hyper::body::Incoming`.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, Bytes, BytesMut};
use futures::Stream;
use http_body_util::BodyDataStream;
use hyper::body::Body;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::trace;

use crate::error::{BoxError, Error, Result};
use crate::search::{StreamSearch, Token};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Forward-only cursor over the boundary-tokenized view of a source.
pub(crate) struct Tokens<S> {
    source: S,
    search: StreamSearch,
    queue: VecDeque<Token>,
    eof: bool,
}

impl<S> Tokens<S> {
    pub(crate) fn new(source: S, needle: &[u8]) -> Self {
        Self {
            source,
            search: StreamSearch::new(needle),
            queue: VecDeque::new(),
            eof: false,
        }
    }
}

impl<S, E> Tokens<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    /// Polls the next token; `Ok(None)` once the source is exhausted.
    pub(crate) fn poll_token(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<Token>>> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Poll::Ready(Ok(Some(token)));
            }
            if self.eof {
                return Poll::Ready(Ok(None));
            }

            match ready!(Pin::new(&mut self.source).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    trace!(len = chunk.len(), "source chunk");
                    self.queue.extend(self.search.feed(chunk));
                }
                Some(Err(e)) => return Poll::Ready(Err(Error::Source(e.into()))),
                None => {
                    trace!("source exhausted");
                    self.eof = true;
                    let rest = self.search.end();
                    if !rest.is_empty() {
                        self.queue.push_back(Token::Literal(rest));
                    }
                }
            }
        }
    }
}

/// Stream of chunks read from an [`AsyncRead`].
pub struct ReadSource<R> {
    reader: R,
    buf: BytesMut,
    capacity: usize,
    done: bool,
}

impl<R> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, READ_CHUNK_SIZE)
    }

    /// Reads at most `capacity` bytes per chunk.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buf: BytesMut::new(),
            capacity: capacity.max(1),
            done: false,
        }
    }
}

impl<R: AsyncRead + Unpin> Stream for ReadSource<R> {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        let this = &mut *self;
        // Each chunk is split off the buffer, so its bytes are handed out
        // without a copy.
        this.buf.resize(this.capacity, 0);
        let mut read_buf = ReadBuf::new(&mut this.buf);
        let polled = Pin::new(&mut this.reader).poll_read(cx, &mut read_buf);
        let filled = read_buf.filled().len();
        match ready!(polled) {
            Ok(()) if filled == 0 => {
                this.done = true;
                Poll::Ready(None)
            }
            Ok(()) => {
                this.buf.truncate(filled);
                Poll::Ready(Some(Ok(this.buf.split().freeze())))
            }
            Err(e) => {
                this.done = true;
                Poll::Ready(Some(Err(e)))
            }
        }
    }
}

/// Stream of the data frames of an HTTP body; trailers are skipped.
pub struct BodySource<B> {
    inner: BodyDataStream<B>,
}

impl<B: Body> BodySource<B> {
    pub fn new(body: B) -> Self {
        Self {
            inner: BodyDataStream::new(body),
        }
    }
}

impl<B> Stream for BodySource<B>
where
    B: Body + Unpin,
{
    type Item = Result<Bytes, B::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let frame = ready!(Pin::new(&mut self.inner).poll_next(cx));
        Poll::Ready(frame.map(|data| data.map(|mut data| data.copy_to_bytes(data.remaining()))))
    }
}
