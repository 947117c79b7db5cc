//! The multipart stream state machine.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use hyper::body::Body;
use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tracing::{debug, trace, warn};

use crate::body::{BodyDecoder, PartBody};
use crate::config::Config;
use crate::error::{BoxError, Error, Result};
use crate::header::parse_part_headers;
use crate::header_block::{HeaderBlock, HeaderEvent};
use crate::part::{FullPart, PartHeaders, StreamingPart};
use crate::search::Token;
use crate::source::{BodySource, ReadSource, Tokens};

enum Stage {
    Prologue,
    Headers(HeaderBlock),
    Body(BodyState),
    Done,
}

struct BodyState {
    decoder: BodyDecoder,
    pending: Option<Bytes>,
    name: String,
    received: u64,
}

/// State shared by a [`Multipart`] and the [`PartBody`] of its current part.
pub(crate) struct Shared<S> {
    tokens: Tokens<S>,
    needle: Bytes,
    config: Config,
    stage: Stage,
    // Number of parts yielded so far; also identifies the current body.
    index: usize,
}

impl<S, E> Shared<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    fn header_block(&self) -> HeaderBlock {
        HeaderBlock::new(self.config.get_max_header_size())
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(error = %err, part = self.index, "multipart stream aborted");
        self.stage = Stage::Done;
        err
    }

    fn poll_next_part(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<(PartHeaders, usize)>>> {
        loop {
            match &mut self.stage {
                Stage::Prologue => match ready!(self.tokens.poll_token(cx)) {
                    Ok(Some(Token::Match)) => {
                        debug!("prologue skipped");
                        self.stage = Stage::Headers(self.header_block());
                    }
                    Ok(Some(Token::Literal(_))) => {}
                    Ok(None) => {
                        debug!("no boundary in payload");
                        self.stage = Stage::Done;
                        return Poll::Ready(Ok(None));
                    }
                    Err(e) => return Poll::Ready(Err(self.fail(e))),
                },
                Stage::Headers(block) => {
                    let token = match ready!(self.tokens.poll_token(cx)) {
                        Ok(token) => token,
                        Err(e) => return Poll::Ready(Err(self.fail(e))),
                    };
                    match block.push(token, &self.needle) {
                        Ok(HeaderEvent::Pending) => {}
                        Ok(HeaderEvent::Terminal) => {
                            debug!(parts = self.index, "terminal boundary");
                            self.stage = Stage::Done;
                            return Poll::Ready(Ok(None));
                        }
                        Ok(HeaderEvent::Complete { lines, leftover }) => {
                            return Poll::Ready(self.start_part(&lines, leftover).map(Some));
                        }
                        Err(e) => return Poll::Ready(Err(self.fail(e))),
                    }
                }
                Stage::Body(_) => {
                    // Discard what the consumer left of the current body.
                    let index = self.index;
                    if let Some(Err(e)) = ready!(self.poll_body(cx, index)) {
                        return Poll::Ready(Err(e));
                    }
                }
                Stage::Done => return Poll::Ready(Ok(None)),
            }
        }
    }

    fn start_part(&mut self, lines: &[String], leftover: Bytes) -> Result<(PartHeaders, usize)> {
        if let Some(limit) = self.config.get_max_parts() {
            if self.index >= limit {
                return Err(self.fail(Error::TooManyParts { limit }));
            }
        }
        let headers = parse_part_headers(lines).map_err(|e| self.fail(e))?;

        self.index += 1;
        debug!(
            part = self.index,
            name = %headers.name,
            filename = ?headers.filename,
            content_type = ?headers.content_type,
            "part headers parsed"
        );

        let (decoder, first) = BodyDecoder::new(leftover);
        self.stage = Stage::Body(BodyState {
            decoder,
            pending: Some(first),
            name: headers.name.clone(),
            received: 0,
        });

        Ok((headers, self.index))
    }

    /// Polls the next chunk of body `index`. Yields `None` at the closing
    /// boundary, or at once if `index` is no longer the current part.
    pub(crate) fn poll_body(
        &mut self,
        cx: &mut Context<'_>,
        index: usize,
    ) -> Poll<Option<Result<Bytes>>> {
        if index != self.index {
            return Poll::Ready(None);
        }

        loop {
            let Stage::Body(body) = &mut self.stage else {
                return Poll::Ready(None);
            };

            let chunk = match body.pending.take() {
                Some(chunk) => chunk,
                None => {
                    let token = match ready!(self.tokens.poll_token(cx)) {
                        Ok(token) => token,
                        Err(e) => return Poll::Ready(Some(Err(self.fail(e)))),
                    };
                    match body.decoder.push(token, &self.needle) {
                        Ok(Some(chunk)) => chunk,
                        Ok(None) => {
                            debug!(part = index, size = body.received, "part body complete");
                            self.stage = Stage::Headers(self.header_block());
                            return Poll::Ready(None);
                        }
                        Err(e) => return Poll::Ready(Some(Err(self.fail(e)))),
                    }
                }
            };

            if chunk.is_empty() {
                continue;
            }

            body.received += chunk.len() as u64;
            if let Some(limit) = self.config.get_max_part_size() {
                if body.received > limit {
                    let name = body.name.clone();
                    let err = self.fail(Error::PartTooLarge { name, limit });
                    return Poll::Ready(Some(Err(err)));
                }
            }
            trace!(part = index, len = chunk.len(), "part body chunk");
            return Poll::Ready(Some(Ok(chunk)));
        }
    }
}

/// A lazy stream of the parts of a `multipart/form-data` payload.
///
/// Parts come out in payload order. Each part's body is a [`PartBody`] that
/// reads from the same source; requesting the next part discards whatever is
/// left of the current body first.
pub struct Multipart<S> {
    shared: Arc<Mutex<Shared<S>>>,
}

impl<S> Multipart<S> {
    /// Decodes `source` with parts delimited by `boundary`, as given in the
    /// request's `Content-Type` header (without the leading `--`).
    pub fn new(source: S, boundary: &str) -> Self {
        Self::with_config(source, boundary, Config::default())
    }

    pub fn with_config(source: S, boundary: &str, config: Config) -> Self {
        let mut needle = Vec::with_capacity(boundary.len() + 2);
        needle.extend_from_slice(b"--");
        needle.extend_from_slice(boundary.as_bytes());
        let needle = Bytes::from(needle);

        let shared = Shared {
            tokens: Tokens::new(source, &needle),
            needle,
            config,
            stage: Stage::Prologue,
            index: 0,
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
        }
    }
}

impl<R: AsyncRead + Unpin> Multipart<ReadSource<R>> {
    /// Decodes a payload read from `reader`.
    pub fn from_reader(reader: R, boundary: &str) -> Self {
        Self::new(ReadSource::new(reader), boundary)
    }
}

impl<B: Body + Unpin> Multipart<BodySource<B>> {
    /// Decodes an HTTP request body.
    pub fn from_body(body: B, boundary: &str) -> Self {
        Self::new(BodySource::new(body), boundary)
    }
}

impl<S, E> Multipart<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    /// Waits for the next part; `Ok(None)` after the closing boundary.
    pub async fn next_part(&mut self) -> Result<Option<StreamingPart<S>>> {
        self.next().await.transpose()
    }
}

impl<S, E> Stream for Multipart<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    type Item = Result<StreamingPart<S>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = ready!(self.shared.lock().poll_next_part(cx));
        Poll::Ready(match polled {
            Ok(Some((headers, index))) => {
                let body = PartBody::new(Arc::clone(&self.shared), index);
                Some(Ok(headers.with_data(body)))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

impl<S, E> StreamingPart<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    /// Reads the body into memory.
    pub async fn into_full(self) -> Result<FullPart> {
        let Self {
            name,
            filename,
            content_type,
            data,
        } = self;
        let data = data.bytes().await?;
        Ok(FullPart {
            name,
            filename,
            content_type,
            data,
        })
    }
}
