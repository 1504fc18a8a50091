//! Outbound request description and its cache key.

use std::fmt::{self, Write as _};

use bytes::Bytes;
use reqwest::Method;
use replay_core::Error;
use url::Url;

/// An outbound HTTP request.
///
/// Headers keep the order they were added in; that order is part of the
/// cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: Vec::new(), body: Bytes::new() }
    }

    /// A GET request for `url`.
    pub fn get(url: &str) -> Result<Self, Error> {
        Ok(Self::new(Method::GET, parse_url(url)?))
    }

    /// A POST request for `url` carrying `body`.
    pub fn post(url: &str, body: impl Into<Bytes>) -> Result<Self, Error> {
        Ok(Self::new(Method::POST, parse_url(url)?).with_body(body))
    }

    /// Append a header. Existing headers with the same name are kept.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The exact textual form of this request, used as its cache key.
    ///
    /// Every header takes part, in order, so two requests for the same URL
    /// that differ only by an injected header (e.g. `Referer`) get
    /// different keys.
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

/// Formats as a request line, one `Name: value` line per header, a blank
/// line, then the body.
///
/// Backslash, CR and LF are escaped in header names and values, and `:`
/// in names, so a header can never forge another line. A non-empty body is
/// tagged `text:` when it is UTF-8 and written as `hex:` plus hex digits
/// otherwise.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.method, self.url)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", Escaped { text: name, colon: true }, Escaped { text: value, colon: false })?;
        }
        writeln!(f)?;
        if self.body.is_empty() {
            return Ok(());
        }
        match std::str::from_utf8(&self.body) {
            Ok(text) => write!(f, "text:{text}"),
            Err(_) => write!(f, "hex:{}", hex::encode(&self.body)),
        }
    }
}

struct Escaped<'a> {
    text: &'a str,
    colon: bool,
}

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.text.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\r' => f.write_str("\\r")?,
                '\n' => f.write_str("\\n")?,
                ':' if self.colon => f.write_str("\\:")?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

fn parse_url(input: &str) -> Result<Url, Error> {
    Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
}
