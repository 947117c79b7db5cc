//! Header block reader.
//!
//! Consumes the boundary-search tokens that follow a boundary and splits them
//! into header lines with a nested CRLF search, up to the blank line that
//! starts the part body.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{Error, Result};
use crate::search::{StreamSearch, Token};

pub(crate) const CRLF: &[u8] = b"\r\n";
const DASH: &[u8] = b"--";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum HeaderEvent {
    /// More tokens are needed.
    Pending,
    /// The boundary was the closing `--boundary--`.
    Terminal,
    /// The header block ended with a blank line.
    Complete { lines: Vec<String>, leftover: Bytes },
}

pub(crate) struct HeaderBlock {
    crlf: StreamSearch,
    // Bytes right after the boundary, until there are enough to tell `--`.
    lead: BytesMut,
    started: bool,
    on_boundary_line: bool,
    last_was_match: bool,
    line: BytesMut,
    lines: Vec<String>,
    size: usize,
    limit: usize,
}

impl HeaderBlock {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            crlf: StreamSearch::new(CRLF),
            lead: BytesMut::new(),
            started: false,
            on_boundary_line: true,
            last_was_match: false,
            line: BytesMut::new(),
            lines: Vec::new(),
            size: 0,
            limit,
        }
    }

    /// Feeds the next boundary-search token; `None` is the end of the source.
    pub(crate) fn push(&mut self, token: Option<Token>, needle: &Bytes) -> Result<HeaderEvent> {
        let chunk = match token {
            None => return Err(Error::UnexpectedEof),
            Some(Token::Literal(bytes)) => bytes,
            Some(Token::Match) if !self.last_was_match => needle.clone(),
            Some(Token::Match) => return Err(Error::UnexpectedBoundary),
        };

        let chunk = if self.started {
            chunk
        } else {
            self.lead.extend_from_slice(&chunk);
            if self.lead.len() < DASH.len() {
                return Ok(HeaderEvent::Pending);
            }
            self.started = true;
            if self.lead.starts_with(DASH) {
                return Ok(HeaderEvent::Terminal);
            }
            self.lead.split().freeze()
        };

        if chunk.is_empty() {
            return Ok(HeaderEvent::Pending);
        }

        let mut tokens = self.crlf.feed(chunk).into_iter();
        while let Some(token) = tokens.next() {
            match token {
                Token::Match if self.last_was_match => {
                    let mut leftover = BytesMut::new();
                    for rest in tokens.by_ref() {
                        match rest {
                            Token::Literal(bytes) => leftover.extend_from_slice(&bytes),
                            Token::Match => leftover.extend_from_slice(CRLF),
                        }
                    }
                    leftover.extend_from_slice(&self.crlf.end());

                    return Ok(HeaderEvent::Complete {
                        lines: std::mem::take(&mut self.lines),
                        leftover: leftover.freeze(),
                    });
                }
                Token::Match => {
                    self.last_was_match = true;
                    self.finish_line();
                }
                Token::Literal(bytes) => {
                    self.last_was_match = false;
                    self.size += bytes.len();
                    if self.size > self.limit {
                        return Err(Error::HeadersTooLarge { limit: self.limit });
                    }
                    self.line.extend_from_slice(&bytes);
                }
            }
        }

        Ok(HeaderEvent::Pending)
    }

    fn finish_line(&mut self) {
        let line = self.line.split();
        if std::mem::replace(&mut self.on_boundary_line, false) {
            // Transport padding after the boundary.
            if line.iter().all(u8::is_ascii_whitespace) {
                return;
            }
        }
        if !line.is_empty() {
            let line = String::from_utf8_lossy(&line).into_owned();
            trace!(%line, "header line");
            self.lines.push(line);
        }
    }
}
