//! HTTP response with live and replayed provenance.
//!
//! A live response may still hold a [`LiveBody`]: the unread connection and
//! whatever decoder sits on top of it. That handle has no serialized form.
//! [`Response::materialize`] drains it into a plain decoded body, after
//! which the response can be converted to a [`StoredResponse`].

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use replay_core::{Error, StoredResponse};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Produced by a delegate performing the network exchange.
    Live,
    /// Reconstructed from a cache entry.
    Replayed,
}

/// Body bytes after every transfer transformation has been undone.
#[derive(Debug, Clone, Default)]
pub struct DecodedBody {
    pub bytes: Bytes,
    /// A content-coding (gzip, br, ...) was removed while reading.
    pub content_decoded: bool,
    /// Text was transcoded from its declared charset to UTF-8.
    pub charset_decoded: bool,
}

/// An unread response body attached to a live response.
#[async_trait]
pub trait LiveBody: Send {
    /// Read the remaining body to the end, decoding it fully.
    async fn read_to_end(self: Box<Self>) -> Result<DecodedBody, Error>;
}

/// An HTTP response.
///
/// Equality covers status line, headers and body only; provenance and any
/// live handle are ignored.
pub struct Response {
    pub status: u16,
    pub reason: Option<String>,
    pub version: Option<String>,
    /// Final URL after redirects, when known.
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    body: Bytes,
    live: Option<Box<dyn LiveBody>>,
    provenance: Provenance,
}

impl Response {
    /// A live response whose body has already been read.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            reason: None,
            version: None,
            url: None,
            headers,
            body: body.into(),
            live: None,
            provenance: Provenance::Live,
        }
    }

    /// A live response whose body will be read from `live` on materialization.
    pub fn streaming(status: u16, headers: Vec<(String, String)>, live: Box<dyn LiveBody>) -> Self {
        Self { live: Some(live), ..Self::new(status, headers, Bytes::new()) }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_replayed(&self) -> bool {
        self.provenance == Provenance::Replayed
    }

    /// Whether a live body handle is still attached.
    pub fn is_streaming(&self) -> bool {
        self.live.is_some()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Decoded body bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotMaterialized` while a live body is attached.
    pub fn body(&self) -> Result<&Bytes, Error> {
        match self.live {
            Some(_) => Err(Error::NotMaterialized),
            None => Ok(&self.body),
        }
    }

    /// Decoded body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Result<Cow<'_, str>, Error> {
        Ok(String::from_utf8_lossy(self.body()?))
    }

    /// Drain the live body, if any, into a plain decoded body.
    ///
    /// Headers describing the undone transformations are adjusted: a
    /// removed content-coding drops `Content-Encoding` and
    /// `Content-Length`, and transcoded text gets `charset=utf-8`.
    /// Calling this on an already materialized response is a no-op.
    pub async fn materialize(&mut self) -> Result<(), Error> {
        let Some(live) = self.live.take() else {
            return Ok(());
        };

        let decoded = live.read_to_end().await?;

        if decoded.content_decoded || decoded.charset_decoded {
            self.remove_header("content-length");
        }
        if decoded.content_decoded {
            self.remove_header("content-encoding");
        }
        if decoded.charset_decoded {
            for (name, value) in self.headers.iter_mut() {
                if name.eq_ignore_ascii_case("content-type") {
                    *value = with_utf8_charset(value);
                }
            }
        }

        self.body = decoded.bytes;
        Ok(())
    }

    fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// The serializable part of this response.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotMaterialized` while a live body is attached.
    pub fn to_stored(&self) -> Result<StoredResponse, Error> {
        Ok(StoredResponse {
            status: self.status,
            reason: self.reason.clone(),
            version: self.version.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body()?.to_vec(),
        })
    }

    /// Rebuild a response from a cache entry.
    pub fn from_stored(stored: StoredResponse) -> Self {
        Self {
            status: stored.status,
            reason: stored.reason,
            version: stored.version,
            url: stored.url,
            headers: stored.headers,
            body: Bytes::from(stored.body),
            live: None,
            provenance: Provenance::Replayed,
        }
    }
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.reason == other.reason
            && self.version == other.version
            && self.url == other.url
            && self.headers == other.headers
            && self.body == other.body
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("streaming", &self.live.is_some())
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// Charset label declared in a Content-Type value, lowercased.
pub fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

/// Rewrite the charset parameter of a Content-Type value to utf-8,
/// adding one if absent.
fn with_utf8_charset(content_type: &str) -> String {
    let mut parts = content_type.split(';').map(str::trim);
    let mime = parts.next().unwrap_or_default();
    let params = parts.filter(|p| {
        p.split_once('=')
            .is_none_or(|(name, _)| !name.trim().eq_ignore_ascii_case("charset"))
    });

    let mut out = mime.to_string();
    for param in params.filter(|p| !p.is_empty()) {
        out.push_str("; ");
        out.push_str(param);
    }
    out.push_str("; charset=utf-8");
    out
}
