//! Navigation target resolution.

use replay_core::Error;
use url::Url;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Resolve `input` into an absolute navigation target.
///
/// 1. Trim surrounding whitespace
/// 2. Join against `base` when given, otherwise default the scheme to https://
/// 3. Lowercase the host
/// 4. Drop the fragment (never sent on the wire)
///
/// The query string is kept as written.
pub fn resolve(base: Option<&Url>, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match base {
        Some(base) => base.join(trimmed),
        None if trimmed.contains("://") => Url::parse(trimmed),
        None => Url::parse(&format!("https://{trimmed}")),
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
