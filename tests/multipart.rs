mod common;

use std::io;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use http_body_util::Full;
use multipart_wire::source::ReadSource;
use multipart_wire::{
    Config, Error, FullPart, Multipart, iterate_multipart, parse_multipart, stream_multipart,
};
use tokio::io::AsyncWriteExt;

use common::{BOUNDARY, chunked, encode, part, reference_parts};

#[tokio::test]
async fn parses_reference_payload_at_any_chunk_size() {
    let payload = encode(&reference_parts(), BOUNDARY);
    for size in [1, 3, 17, payload.len()] {
        let parts = parse_multipart(chunked(&payload, size), BOUNDARY)
            .await
            .unwrap();
        assert_eq!(parts, reference_parts(), "chunk size {size}");
    }
}

#[tokio::test]
async fn streams_bodies_in_several_chunks() {
    let payload = encode(&reference_parts(), BOUNDARY);
    let mut multipart = stream_multipart(chunked(&payload, 3), BOUNDARY);

    let mut seen = Vec::new();
    while let Some(mut part) = multipart.next_part().await.unwrap() {
        let mut chunks = 0;
        let mut body = Vec::new();
        while let Some(chunk) = part.data.next().await {
            let chunk = chunk.unwrap();
            assert!(!chunk.is_empty());
            chunks += 1;
            body.extend_from_slice(&chunk);
        }
        assert!(chunks > 1, "part {} arrived in one chunk", part.name);
        seen.push(part.map_data(|_| Bytes::from(body)));
    }

    assert_eq!(seen, reference_parts());
}

#[tokio::test]
async fn abandoned_body_is_drained_before_next_part() {
    let payload = encode(&reference_parts(), BOUNDARY);
    let mut multipart = Multipart::new(chunked(&payload, 5), BOUNDARY);

    let mut a = multipart.next_part().await.unwrap().unwrap();
    assert_eq!(a.name, "a");
    let first = a.data.next().await.unwrap().unwrap();
    assert!(b"form value a".starts_with(&first));

    let b = multipart.next_part().await.unwrap().unwrap();
    assert_eq!(b.name, "b");
    assert!(a.data.next().await.is_none());
    assert_eq!(&b.data.bytes().await.unwrap()[..], b"file value b");

    let c = multipart.next_part().await.unwrap().unwrap();
    assert_eq!(c.name, "c");
    assert_eq!(c.content_type.as_deref(), Some("text/plain"));
    drop(c);

    assert!(multipart.next_part().await.unwrap().is_none());
    assert!(multipart.next_part().await.unwrap().is_none());
}

#[tokio::test]
async fn iterates_full_parts_in_order() {
    let payload = encode(&reference_parts(), BOUNDARY);
    let mut parts = Box::pin(iterate_multipart(chunked(&payload, 7), BOUNDARY));

    for expected in reference_parts() {
        let part = parts.try_next().await.unwrap().unwrap();
        assert_eq!(part, expected);
    }
    assert!(parts.try_next().await.unwrap().is_none());
}

#[tokio::test]
async fn boundary_text_inside_data_is_not_a_delimiter() {
    let expected = vec![
        part("a", None, None, b"see --some random boundary here"),
        part("b", None, None, b"ends with --some random boundary"),
        part("c", None, None, b"--some random boundary at the start"),
    ];
    let payload = encode(&expected, BOUNDARY);
    for size in [1, 3, 17, payload.len()] {
        let parts = parse_multipart(chunked(&payload, size), BOUNDARY)
            .await
            .unwrap();
        assert_eq!(parts, expected, "chunk size {size}");
    }
}

#[tokio::test]
async fn unescapes_quoted_filename() {
    let payload = b"--xyz\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"a\\\"b.txt\"\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        content\r\n\
        --xyz--";
    let parts = parse_multipart(chunked(payload, 4), "xyz").await.unwrap();
    assert_eq!(parts, vec![part("file", Some("a\"b.txt"), Some("text/plain"), b"content")]);
    assert!(parts[0].is_file());
}

#[tokio::test]
async fn empty_body_is_not_an_error() {
    let expected = vec![
        part("empty", None, None, b""),
        part("next", None, None, b"x"),
        part("last", Some("empty.bin"), None, b""),
    ];
    let payload = encode(&expected, BOUNDARY);
    for size in [1, 2, payload.len()] {
        let parts = parse_multipart(chunked(&payload, size), BOUNDARY)
            .await
            .unwrap();
        assert_eq!(parts, expected, "chunk size {size}");
    }
}

#[tokio::test]
async fn epilogue_is_ignored() {
    let mut payload = encode(&reference_parts(), BOUNDARY);
    payload.extend_from_slice(b"\r\nepilogue\r\n--some random boundary\r\nnot a header\r\n\r\n");
    for size in [1, 3, 17, payload.len()] {
        let parts = parse_multipart(chunked(&payload, size), BOUNDARY)
            .await
            .unwrap();
        assert_eq!(parts, reference_parts(), "chunk size {size}");
    }
}

#[tokio::test]
async fn prologue_is_ignored() {
    let encoded = encode(&reference_parts(), BOUNDARY);

    let mut payload = b"This is the preamble. It is to be ignored.".to_vec();
    payload.extend_from_slice(&encoded);
    let parts = parse_multipart(chunked(&payload, 3), BOUNDARY).await.unwrap();
    assert_eq!(parts, reference_parts());

    // Without a line break before the first boundary.
    let parts = parse_multipart(chunked(&encoded[2..], 3), BOUNDARY)
        .await
        .unwrap();
    assert_eq!(parts, reference_parts());
}

#[tokio::test]
async fn payload_without_boundary_has_no_parts() {
    let parts = parse_multipart(chunked(b"just some bytes", 4), BOUNDARY)
        .await
        .unwrap();
    assert!(parts.is_empty());

    let parts = parse_multipart(chunked(b"", 4), BOUNDARY).await.unwrap();
    assert!(parts.is_empty());

    let parts = parse_multipart(chunked(&encode(&[], BOUNDARY), 4), BOUNDARY)
        .await
        .unwrap();
    assert!(parts.is_empty());
}

#[tokio::test]
async fn truncated_payload_is_an_error() {
    let payload = encode(&reference_parts(), BOUNDARY);
    let find = |needle: &[u8]| {
        payload
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap()
    };

    let cuts = [
        find(b"Content-Type") + 3,
        find(b"has\r\n"),
        payload.len() - 2,
        payload.len() - 1,
    ];
    for cut in cuts {
        for size in [1, 3, cut] {
            let err = parse_multipart(chunked(&payload[..cut], size), BOUNDARY)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::UnexpectedEof), "cut {cut}: {err}");
            assert!(err.is_malformed());
        }
    }
}

#[tokio::test]
async fn malformed_headers_are_reported() {
    let payload = b"--xyz\r\nContent-Disposition: attachment; name=\"a\"\r\n\r\nbody\r\n--xyz--";
    let err = parse_multipart(chunked(payload, 5), "xyz").await.unwrap_err();
    assert!(matches!(err, Error::MissingFormData(_)));

    let payload = b"--xyz\r\nContent-Type: text/plain\r\n\r\nbody\r\n--xyz--";
    let err = parse_multipart(chunked(payload, 5), "xyz").await.unwrap_err();
    assert!(matches!(err, Error::MissingContentDisposition));

    let payload = b"--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\n--xyz\r\n\r\n--xyz--";
    let err = parse_multipart(chunked(payload, 5), "xyz").await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedBoundary));
}

#[tokio::test]
async fn unknown_header_names_are_ignored() {
    for extra in ["X Custom Header: y", ": y"] {
        let payload = format!(
            "--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\n{extra}\r\n\r\nbody\r\n--xyz--"
        );
        for size in [1, 5, payload.len()] {
            let parts = parse_multipart(chunked(payload.as_bytes(), size), "xyz")
                .await
                .unwrap();
            assert_eq!(parts, vec![part("a", None, None, b"body")], "{extra:?} at {size}");
        }
    }
}

#[tokio::test]
async fn stream_ends_after_an_error() {
    let payload = b"--xyz\r\nno colon here\r\n\r\nbody\r\n--xyz\r\n\
        Content-Disposition: form-data; name=\"b\"\r\n\r\nb\r\n--xyz--";
    let mut multipart = Multipart::new(chunked(payload, 5), "xyz");
    let err = multipart.next_part().await.unwrap_err();
    assert!(matches!(err, Error::MissingColon(_)));
    assert!(multipart.next_part().await.unwrap().is_none());
}

#[tokio::test]
async fn source_errors_are_propagated() {
    let chunks: Vec<io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(
            b"--xyz\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\npartial",
        )),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
    ];
    let mut multipart = Multipart::new(stream::iter(chunks), "xyz");

    let part = multipart.next_part().await.unwrap().unwrap();
    let err = part.data.bytes().await.unwrap_err();
    assert!(matches!(err, Error::Source(_)));
    assert!(!err.is_malformed());
    assert!(multipart.next_part().await.unwrap().is_none());
}

#[tokio::test]
async fn reads_from_async_reader() {
    let (mut writer, reader) = tokio::io::duplex(16);
    let payload = encode(&reference_parts(), BOUNDARY);
    let writer_task = tokio::spawn(async move {
        writer.write_all(&payload).await.unwrap();
    });

    let parts: Vec<FullPart> = Multipart::from_reader(reader, BOUNDARY)
        .and_then(|part| part.into_full())
        .try_collect()
        .await
        .unwrap();
    writer_task.await.unwrap();

    assert_eq!(parts, reference_parts());
}

#[tokio::test]
async fn reads_from_async_reader_in_small_chunks() {
    let payload = encode(&reference_parts(), BOUNDARY);
    let source = ReadSource::with_capacity(&payload[..], 3);
    let parts = parse_multipart(source, BOUNDARY).await.unwrap();
    assert_eq!(parts, reference_parts());
}

#[tokio::test]
async fn reads_from_http_body() {
    let payload = encode(&reference_parts(), BOUNDARY);
    let parts: Vec<FullPart> = Multipart::from_body(Full::new(Bytes::from(payload)), BOUNDARY)
        .and_then(|part| part.into_full())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(parts, reference_parts());
}

async fn parse_with(config: Config) -> Result<Vec<FullPart>, Error> {
    let payload = encode(&reference_parts(), BOUNDARY);
    Multipart::with_config(chunked(&payload, 4), BOUNDARY, config)
        .and_then(|part| part.into_full())
        .try_collect()
        .await
}

#[tokio::test]
async fn limits_are_enforced() {
    let err = parse_with(Config::new().max_parts(2)).await.unwrap_err();
    assert!(matches!(err, Error::TooManyParts { limit: 2 }));

    let err = parse_with(Config::new().max_part_size(5)).await.unwrap_err();
    assert!(matches!(err, Error::PartTooLarge { ref name, limit: 5 } if name == "a"));

    let err = parse_with(Config::new().max_header_size(16)).await.unwrap_err();
    assert!(matches!(err, Error::HeadersTooLarge { limit: 16 }));

    let parts = parse_with(Config::new().max_parts(3).max_part_size(64))
        .await
        .unwrap();
    assert_eq!(parts, reference_parts());
}
