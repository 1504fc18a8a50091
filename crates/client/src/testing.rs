//! Shared fixtures for unit tests: a canned local HTTP server, a counting
//! mock delegate, and a chunked live body.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use replay_core::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::delegate::{Delegate, FromConfig, RequestOptions};
use crate::http::{DecodedBody, LiveBody, Request, Response};

/// gzip of [`GZIP_PAGE_TEXT`], mtime zeroed.
pub const GZIP_PAGE: &[u8] = &[
    0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x03, 0xb3, 0xc9, 0x28, 0xc9, 0xcd, 0xb1, 0xb3, 0x49, 0xca,
    0x4f, 0xa9, 0xb4, 0xb3, 0x49, 0x54, 0xc8, 0x28, 0x4a, 0x4d, 0xb3, 0x55, 0xd2, 0x2f, 0x48, 0x4c, 0x4f, 0x35, 0x52,
    0xb2, 0xf3, 0x4b, 0xad, 0x28, 0xb1, 0xd1, 0x4f, 0xb4, 0x53, 0xc8, 0x48, 0xcd, 0xc9, 0xc9, 0x57, 0x48, 0xaf, 0xca,
    0x2c, 0xb0, 0xd1, 0x87, 0x28, 0xd5, 0x07, 0xeb, 0x03, 0x00, 0x80, 0xd5, 0xb2, 0x6a, 0x3e, 0x00, 0x00, 0x00,
];

pub const GZIP_PAGE_TEXT: &str = r#"<html><body><a href="/page2">Next</a> hello gzip</body></html>"#;

/// Build raw HTTP/1.1 response bytes with Content-Length and Connection: close.
pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()));
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Local server answering every request with the same canned bytes.
pub struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn start(response: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let response = response.clone();
                tokio::spawn(async move {
                    let mut received = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => received.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of connections served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Live body delivered in chunks, optionally flagged as decoded.
pub struct ChunkedBody {
    chunks: Vec<Bytes>,
    content_decoded: bool,
    charset_decoded: bool,
}

impl ChunkedBody {
    pub fn new<const N: usize>(chunks: [&str; N]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
            content_decoded: false,
            charset_decoded: false,
        }
    }

    pub fn content_decoded(mut self) -> Self {
        self.content_decoded = true;
        self
    }

    pub fn charset_decoded(mut self) -> Self {
        self.charset_decoded = true;
        self
    }
}

#[async_trait]
impl LiveBody for ChunkedBody {
    async fn read_to_end(self: Box<Self>) -> Result<DecodedBody, Error> {
        Ok(DecodedBody {
            bytes: Bytes::from(self.chunks.concat()),
            content_decoded: self.content_decoded,
            charset_decoded: self.charset_decoded,
        })
    }
}

/// Live body carrying hex text that decodes to the real body, standing in
/// for a content-coding.
struct HexCodedBody(String);

#[async_trait]
impl LiveBody for HexCodedBody {
    async fn read_to_end(self: Box<Self>) -> Result<DecodedBody, Error> {
        let bytes = hex::decode(&self.0).map_err(|e| Error::Delegate(e.to_string()))?;
        Ok(DecodedBody { bytes: Bytes::from(bytes), content_decoded: true, charset_decoded: false })
    }
}

/// A page served by [`MockDelegate`].
#[derive(Clone)]
pub struct MockPage {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Serve the body hex-encoded with `Content-Encoding: x-hex`.
    pub hex_coded: bool,
}

impl MockPage {
    pub fn html(body: &str) -> Self {
        Self { status: 200, content_type: "text/html", body: body.to_string(), hex_coded: false }
    }
}

/// Delegate serving canned pages by URL and recording every request.
#[derive(Default)]
pub struct MockDelegate {
    pages: HashMap<String, MockPage>,
    pub requests: Vec<Request>,
    pub fail_next: bool,
}

impl MockDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: MockPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.len()
    }
}

#[async_trait]
impl Delegate for MockDelegate {
    async fn perform_request(&mut self, request: &Request, _options: &RequestOptions) -> Result<Response, Error> {
        self.requests.push(request.clone());

        if std::mem::take(&mut self.fail_next) {
            return Err(Error::HttpError("connection reset".into()));
        }

        let Some(page) = self.pages.get(request.url.as_str()).cloned() else {
            return Ok(Response::new(404, vec![("content-type".into(), "text/plain".into())], "not found")
                .with_url(request.url.as_str()));
        };

        let mut headers = vec![("content-type".to_string(), page.content_type.to_string())];
        let live: Box<dyn LiveBody> = if page.hex_coded {
            headers.push(("content-encoding".into(), "x-hex".into()));
            Box::new(HexCodedBody(hex::encode(&page.body)))
        } else {
            Box::new(ChunkedBody { chunks: vec![Bytes::from(page.body)], content_decoded: false, charset_decoded: false })
        };

        Ok(Response::streaming(page.status, headers, live)
            .with_reason("OK")
            .with_url(request.url.as_str()))
    }
}

impl FromConfig for MockDelegate {
    type Config = ();

    fn from_config(_config: ()) -> Result<Self, Error> {
        Ok(Self::new())
    }
}
