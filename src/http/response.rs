//! Buffered HTTP response value.
//!
//! # Design Decisions
//! - Immutable once built; layers pass it through untouched
//! - Header names stored lowercased so lookups are case-insensitive
//! - Body kept as raw bytes; text decoding is lossy and on demand

use std::collections::HashMap;

use bytes::Bytes;

/// A completed, non-streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status_code: u16,
    body_bytes: Bytes,
    headers: HashMap<String, String>,
    reason_phrase: Option<String>,
}

impl Response {
    pub fn new(status_code: u16, body_bytes: impl Into<Bytes>) -> Self {
        Self {
            status_code,
            body_bytes: body_bytes.into(),
            headers: HashMap::new(),
            reason_phrase: None,
        }
    }

    /// Attach headers. Names are folded to lowercase.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers
                .insert(name.as_ref().to_ascii_lowercase(), value.into());
        }
        self
    }

    pub fn with_reason_phrase(mut self, reason: impl Into<String>) -> Self {
        self.reason_phrase = Some(reason.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body_bytes
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn reason_phrase(&self) -> Option<&str> {
        self.reason_phrase.as_deref()
    }

    /// 200..=299.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Declared length, falling back to the buffered body size.
    pub fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(self.body_bytes.len())
    }
}

/// Case-insensitive lookup in a plain header map.
pub fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
