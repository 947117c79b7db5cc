//! Part header parsing.

use http::HeaderName;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::error::{Error, Result};
use crate::part::PartHeaders;

const FORM_DATA: &str = "form-data";

/// Builds part metadata from the raw header lines of one part.
///
/// Headers other than `Content-Disposition` and `Content-Type` are ignored,
/// including lines whose name is not a valid header name. Parameters of a
/// repeated `Content-Disposition` are merged, later values winning; a
/// repeated `Content-Type` replaces the earlier one.
pub fn parse_part_headers<L: AsRef<str>>(lines: &[L]) -> Result<PartHeaders> {
    let mut disposition: Option<(String, Option<String>)> = None;
    let mut content_type = None;

    for line in lines {
        let line = line.as_ref();
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::MissingColon(line.to_owned()))?;
        let Ok(header) = HeaderName::from_bytes(name.trim().as_bytes()) else {
            continue;
        };
        let value = value.trim();

        if header == CONTENT_DISPOSITION {
            let (name, filename) = parse_content_disposition(value)?;
            let earlier = disposition.take().and_then(|(_, filename)| filename);
            disposition = Some((name, filename.or(earlier)));
        } else if header == CONTENT_TYPE {
            content_type = Some(value.to_owned());
        }
    }

    let (name, filename) = disposition.ok_or(Error::MissingContentDisposition)?;
    Ok(PartHeaders {
        name,
        filename,
        content_type,
    })
}

/// Parses a `Content-Disposition` value into the field name and filename.
///
/// Format: `form-data; name="field"; filename="file.txt"`
pub fn parse_content_disposition(value: &str) -> Result<(String, Option<String>)> {
    let mut params = split_params(value).into_iter().map(str::trim);
    if params.next() != Some(FORM_DATA) {
        return Err(Error::MissingFormData(value.to_owned()));
    }

    let mut name = None;
    let mut filename = None;
    for param in params {
        let (key, value) = parse_key_value(param)?;
        if key.eq_ignore_ascii_case("name") {
            name = Some(value);
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(value);
        }
    }

    match name {
        Some(name) if !name.is_empty() => Ok((name, filename)),
        _ => Err(Error::MissingName(value.to_owned())),
    }
}

/// Splits on `;` outside of double-quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '"' => quoted = !quoted,
            '\\' if quoted => escaped = true,
            ';' if !quoted => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);

    params
}

fn parse_key_value(param: &str) -> Result<(&str, String)> {
    let (key, raw) = param
        .split_once('=')
        .ok_or_else(|| Error::MissingValue(param.to_owned()))?;
    let raw = raw.trim();

    let value = match raw.strip_prefix('"') {
        Some(rest) => {
            let inner = rest
                .strip_suffix('"')
                .ok_or_else(|| Error::MismatchedQuotes(raw.to_owned()))?;
            unescape(inner)
        }
        None if raw.ends_with('"') => return Err(Error::MismatchedQuotes(raw.to_owned())),
        None => raw.to_owned(),
    };

    Ok((key.trim(), value))
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut escaped = false;
    for c in quoted.chars() {
        if c == '\\' && !escaped {
            escaped = true;
            continue;
        }
        escaped = false;
        out.push(c);
    }
    out
}
