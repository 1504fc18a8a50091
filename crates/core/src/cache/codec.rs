//! Versioned encoding of cached responses.
//!
//! Entries are written as a JSON envelope tagged with a codec name and a
//! schema version. Readers reject anything they did not write themselves,
//! so entries left behind by an older schema surface as a decode error the
//! caller can treat as a miss.

use serde::{Deserialize, Serialize};

/// Tag identifying payloads written by this codec.
pub const CODEC_NAME: &str = "replay-response";

/// Current schema version. Bump when `StoredResponse` changes shape.
pub const CODEC_VERSION: u32 = 1;

/// Errors produced while encoding or decoding a stored payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("could not encode response: {0}")]
    Encode(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("not a {CODEC_NAME} payload (found codec {0:?})")]
    ForeignCodec(String),

    #[error("unsupported schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// The serializable part of an HTTP response.
///
/// Holds only plain data: status line, ordered headers and the decoded body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub version: Option<String>,
    pub url: Option<String>,
    pub headers: Vec<(String, String)>,
    #[serde(with = "hex_body")]
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    codec: &'a str,
    version: u32,
    response: &'a StoredResponse,
}

#[derive(Deserialize)]
struct Header {
    codec: String,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    response: StoredResponse,
}

/// Encode a response into the bytes written to the cache.
pub fn encode(response: &StoredResponse) -> Result<Vec<u8>, CodecError> {
    let envelope = EnvelopeRef { codec: CODEC_NAME, version: CODEC_VERSION, response };
    serde_json::to_vec(&envelope).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode bytes previously produced by [`encode`].
///
/// The envelope header is checked before the body is parsed so a
/// version mismatch is reported as such rather than as a shape error.
pub fn decode(bytes: &[u8]) -> Result<StoredResponse, CodecError> {
    let header: Header = serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;

    if header.codec != CODEC_NAME {
        return Err(CodecError::ForeignCodec(header.codec));
    }
    if header.version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion { found: header.version, expected: CODEC_VERSION });
    }

    let envelope: Envelope = serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
    Ok(envelope.response)
}

mod hex_body {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StoredResponse {
        StoredResponse {
            status: 200,
            reason: Some("OK".into()),
            version: Some("HTTP/1.1".into()),
            url: Some("https://example.com/page1".into()),
            headers: vec![
                ("content-type".into(), "text/html; charset=utf-8".into()),
                ("x-b".into(), "2".into()),
                ("x-a".into(), "1".into()),
            ],
            body: "<p>caf\u{e9}</p>".as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_decode_returns_what_was_encoded() {
        let response = sample();
        assert_eq!(decode(&encode(&response).unwrap()).unwrap(), response);
    }

    #[test]
    fn test_encode_writes_tagged_envelope() {
        let bytes = encode(&sample()).unwrap();
        assert!(bytes.starts_with(br#"{"codec":"replay-response","version":1,"response":{"#));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(encode(&sample()).unwrap(), encode(&sample()).unwrap());
    }

    #[test]
    fn test_header_order_survives() {
        let decoded = decode(&encode(&sample()).unwrap()).unwrap();
        let names: Vec<_> = decoded.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["content-type", "x-b", "x-a"]);
    }

    #[test]
    fn test_binary_body() {
        let response = StoredResponse { body: vec![0, 159, 146, 150, 255], ..sample() };
        assert_eq!(decode(&encode(&response).unwrap()).unwrap().body, vec![0, 159, 146, 150, 255]);
    }

    #[test]
    fn test_old_version_rejected() {
        let bytes = br#"{"codec":"replay-response","version":0,"response":{}}"#;
        assert_eq!(decode(bytes), Err(CodecError::UnsupportedVersion { found: 0, expected: CODEC_VERSION }));
    }

    #[test]
    fn test_foreign_codec_rejected() {
        let bytes = br#"{"codec":"storable","version":1}"#;
        assert!(matches!(decode(bytes), Err(CodecError::ForeignCodec(c)) if c == "storable"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(decode(b"\x04\x0b\x03\x00"), Err(CodecError::Malformed(_))));
        assert!(matches!(decode(b""), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_bad_hex_body_rejected() {
        let bytes = br#"{"codec":"replay-response","version":1,"response":{"status":200,"reason":null,"version":null,"url":null,"headers":[],"body":"zz"}}"#;
        assert!(matches!(decode(bytes), Err(CodecError::Malformed(_))));
    }
}
