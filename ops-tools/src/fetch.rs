//! JSON GET helper shared by the HTTP-backed tools.

use std::fmt;
use std::time::Duration;

use hyper::header::{ACCEPT, HeaderName, HeaderValue, USER_AGENT};
use hyper::{StatusCode, Uri};
use ops_adapters::http_client::HttpsClient;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Default per-request limit for data-source calls.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

const AGENT: &str = concat!("ops-assistant/", env!("CARGO_PKG_VERSION"));

/// Reasons a fetch did not produce a decoded body.
#[derive(Debug)]
pub(crate) enum FetchError {
    /// Upstream answered with a non-success status.
    Status { status: StatusCode, endpoint: String },
    /// Connection, timeout, or URL failure.
    Transport(String),
    /// Body was not the expected JSON.
    Decode(String),
}

impl FetchError {
    pub(crate) fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, endpoint } => write!(f, "{status} for url: {endpoint}"),
            Self::Transport(reason) => f.write_str(reason),
            Self::Decode(reason) => write!(f, "invalid response body: {reason}"),
        }
    }
}

/// Thin wrapper that GETs a URL and decodes the JSON body.
#[derive(Clone, Debug)]
pub(crate) struct JsonFetcher {
    client: HttpsClient,
    timeout: Duration,
    provider: &'static str,
}

impl JsonFetcher {
    pub(crate) fn new(client: HttpsClient, provider: &'static str) -> Self {
        Self {
            client,
            timeout: DEFAULT_TOOL_TIMEOUT,
            provider,
        }
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) async fn get_json<T>(
        &self,
        url: &Url,
        extra_headers: &[(HeaderName, HeaderValue)],
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|err| FetchError::Transport(format!("invalid url {}: {err}", redact(url))))?;

        let mut headers = vec![(USER_AGENT, HeaderValue::from_static(AGENT))];
        if !extra_headers.iter().any(|(name, _)| *name == ACCEPT) {
            headers.push((ACCEPT, HeaderValue::from_static("application/json")));
        }
        headers.extend(extra_headers.iter().cloned());

        let reply = self
            .client
            .get(uri, &headers, self.timeout, self.provider)
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        debug!(provider = self.provider, status = %reply.status, bytes = reply.body.len(), "fetched");
        if !reply.status.is_success() {
            return Err(FetchError::Status {
                status: reply.status,
                endpoint: redact(url),
            });
        }

        serde_json::from_slice(&reply.body).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

/// Renders `url` without its query string, which may carry API keys.
pub(crate) fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}

/// Joins `path` onto `base`, tolerating a missing trailing slash on the base.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, FetchError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|err| FetchError::Transport(format!("invalid endpoint {path}: {err}")))
}

/// Parses a configured base URL.
pub(crate) fn parse_base(raw: &str) -> Result<Url, String> {
    Url::parse(raw).map_err(|err| format!("invalid base url `{raw}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_drops_query() {
        let url = Url::parse("https://api.example.com/v2/everything?q=ai&apiKey=secret").unwrap();
        assert_eq!(redact(&url), "https://api.example.com/v2/everything");
    }

    #[test]
    fn status_message_carries_reason_phrase() {
        let err = FetchError::Status {
            status: StatusCode::NOT_FOUND,
            endpoint: "https://api.example.com/weather".into(),
        };
        assert_eq!(err.to_string(), "404 Not Found for url: https://api.example.com/weather");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn endpoint_joins_with_or_without_trailing_slash() {
        let bare = Url::parse("https://newsapi.org/v2").unwrap();
        let slashed = Url::parse("https://newsapi.org/v2/").unwrap();
        assert_eq!(endpoint(&bare, "everything").unwrap().as_str(), "https://newsapi.org/v2/everything");
        assert_eq!(endpoint(&slashed, "everything").unwrap().as_str(), "https://newsapi.org/v2/everything");
    }
}
