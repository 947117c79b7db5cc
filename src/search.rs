//! Streaming substring search over chunked input.
//!
//! [`StreamSearch`] looks for a fixed needle in a sequence of chunks and turns
//! them into [`Token`]s. A needle split across two chunks is still found: the
//! longest tail of the input that could start a match is held back in a carry
//! buffer until the next chunk (or [`StreamSearch::end`]) resolves it.

use bytes::{Bytes, BytesMut};
use memchr::memmem::Finder;

/// A piece of searched input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Input bytes that are not part of a match. Never empty when produced by
    /// [`StreamSearch`].
    Literal(Bytes),
    /// One occurrence of the needle.
    Match,
}

#[derive(Debug)]
pub struct StreamSearch {
    finder: Finder<'static>,
    carry: BytesMut,
}

impl StreamSearch {
    /// Creates a search for `needle`.
    ///
    /// # Panics
    ///
    /// Panics if `needle` is empty.
    pub fn new(needle: &[u8]) -> Self {
        assert!(!needle.is_empty(), "search needle must not be empty");
        Self {
            finder: Finder::new(needle).into_owned(),
            carry: BytesMut::with_capacity(needle.len()),
        }
    }

    /// Returns `true` when no partial match is held back.
    pub fn is_idle(&self) -> bool {
        self.carry.is_empty()
    }

    /// Scans `chunk`, continuing any partial match left by the previous call.
    pub fn feed(&mut self, chunk: Bytes) -> Vec<Token> {
        let mut tokens = Vec::new();
        if chunk.is_empty() {
            return tokens;
        }

        let window = if self.carry.is_empty() {
            chunk
        } else {
            self.carry.extend_from_slice(&chunk);
            self.carry.split().freeze()
        };

        let needle_len = self.finder.needle().len();
        let mut pos = 0;
        while let Some(offset) = self.finder.find(&window[pos..]) {
            if offset > 0 {
                tokens.push(Token::Literal(window.slice(pos..pos + offset)));
            }
            tokens.push(Token::Match);
            pos += offset + needle_len;
        }

        let keep = partial_match_len(&window[pos..], self.finder.needle());
        let end = window.len() - keep;
        if end > pos {
            tokens.push(Token::Literal(window.slice(pos..end)));
        }
        self.carry.extend_from_slice(&window[end..]);

        tokens
    }

    /// Hands back the bytes held for a partial match that never completed.
    pub fn end(&mut self) -> Bytes {
        self.carry.split().freeze()
    }
}

/// Length of the longest suffix of `tail` that is a proper prefix of `needle`.
fn partial_match_len(tail: &[u8], needle: &[u8]) -> usize {
    let max = tail.len().min(needle.len() - 1);
    (1..=max)
        .rev()
        .find(|&k| tail.ends_with(&needle[..k]))
        .unwrap_or(0)
}
