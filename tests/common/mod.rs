#![allow(dead_code)]

use std::io;

use bytes::Bytes;
use futures::stream::{self, Iter};
use multipart_wire::FullPart;

pub const BOUNDARY: &str = "some random boundary";

pub type ChunkStream = Iter<std::vec::IntoIter<io::Result<Bytes>>>;

pub fn part(name: &str, filename: Option<&str>, content_type: Option<&str>, data: &[u8]) -> FullPart {
    FullPart {
        name: name.to_owned(),
        filename: filename.map(str::to_owned),
        content_type: content_type.map(str::to_owned),
        data: Bytes::copy_from_slice(data),
    }
}

/// The three parts of the reference payload.
pub fn reference_parts() -> Vec<FullPart> {
    vec![
        part("a", None, None, b"form value a"),
        part("b", Some("b.txt"), None, b"file value b"),
        part(
            "c",
            Some("c.txt"),
            Some("text/plain"),
            b"file value c\r\nhas\r\nsome new \r\n lines",
        ),
    ]
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Encodes `parts` as a `multipart/form-data` payload.
pub fn encode(parts: &[FullPart], boundary: &str) -> Vec<u8> {
    let delimiter = format!("\r\n--{boundary}");
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(delimiter.as_bytes());
        out.extend_from_slice(b"\r\n");
        let mut headers = format!("Content-Disposition: form-data; name=\"{}\"", quote(&part.name));
        if let Some(filename) = &part.filename {
            headers.push_str(&format!("; filename=\"{}\"", quote(filename)));
        }
        if let Some(content_type) = &part.content_type {
            headers.push_str(&format!("\r\nContent-Type: {content_type}"));
        }
        out.extend_from_slice(headers.as_bytes());
        out.extend_from_slice(b"\r\n\r\n");
        out.extend_from_slice(&part.data);
    }
    out.extend_from_slice(delimiter.as_bytes());
    out.extend_from_slice(b"--");
    out
}

/// A source delivering `payload` in chunks of `size` bytes.
pub fn chunked(payload: &[u8], size: usize) -> ChunkStream {
    let chunks: Vec<_> = payload
        .chunks(size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    stream::iter(chunks)
}
