//! Delivery of compiled output
//!
//! A PDF can be handed back as raw bytes or as base64 text. The base64
//! form is split into 76-column lines terminated by `\r\n`, as mail and
//! most HTTP clients expect.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

/// Width of a base64 output line
pub const BASE64_LINE_WIDTH: usize = 76;

/// Requested encoding of returned content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Raw,
    Base64,
}

impl ContentType {
    /// Parse `raw` or `base64`
    ///
    /// Anything else is answered with a [`Rejection`] instead of an error,
    /// so callers can hand it straight back to the client.
    pub fn parse(value: &str) -> Result<Self, Rejection> {
        match value {
            "raw" => Ok(ContentType::Raw),
            "base64" => Ok(ContentType::Base64),
            _ => Err(Rejection::invalid_content_type()),
        }
    }

    /// Encode `bytes` for delivery
    pub fn encode(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            ContentType::Raw => bytes.to_vec(),
            ContentType::Base64 => encode_base64_chunked(bytes).into_bytes(),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Raw => write!(f, "raw"),
            ContentType::Base64 => write!(f, "base64"),
        }
    }
}

/// A structured refusal returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    #[serde(skip)]
    pub status: u16,
    pub message: String,
}

impl Rejection {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_content_type() -> Self {
        Self::new(400, "Wrong type set. Use raw or base64.")
    }

    /// JSON body, e.g. `{"message":"..."}`
    pub fn to_json(&self) -> String {
        serde_json::json!({ "message": self.message }).to_string()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.to_json())
    }
}

/// Base64 with a `\r\n` after every 76 columns, including the last line
pub fn encode_base64_chunked(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_WIDTH * 2 + 2);
    for line in encoded.as_bytes().chunks(BASE64_LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(&String::from_utf8_lossy(line));
        out.push_str("\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type() {
        assert_eq!(ContentType::parse("raw"), Ok(ContentType::Raw));
        assert_eq!(ContentType::parse("base64"), Ok(ContentType::Base64));
    }

    #[test]
    fn test_unknown_content_type_is_rejected() {
        let rejection = ContentType::parse("hex").unwrap_err();
        assert_eq!(rejection.status, 400);
        assert_eq!(
            rejection.to_json(),
            r#"{"message":"Wrong type set. Use raw or base64."}"#
        );
        assert!(ContentType::parse("RAW").is_err());
    }

    #[test]
    fn test_base64_short_input() {
        assert_eq!(encode_base64_chunked(b"hello"), "aGVsbG8=\r\n");
        assert_eq!(encode_base64_chunked(b""), "");
    }

    #[test]
    fn test_base64_wraps_at_76_columns() {
        let data = vec![0xABu8; 120];
        let out = encode_base64_chunked(&data);
        let lines: Vec<&str> = out.split("\r\n").collect();

        // 120 bytes -> 160 chars -> 76 + 76 + 8, then the trailing empty split
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 76);
        assert_eq!(lines[2].len(), 8);
        assert_eq!(lines[3], "");
        assert!(out.ends_with("\r\n"));

        let joined: String = lines.concat();
        assert_eq!(STANDARD.decode(joined).unwrap(), data);
    }

    #[test]
    fn test_encode_raw_is_identity() {
        assert_eq!(ContentType::Raw.encode(b"%PDF"), b"%PDF".to_vec());
        assert_eq!(ContentType::Base64.encode(b"%PDF"), b"JVBERg==\r\n".to_vec());
    }
}
