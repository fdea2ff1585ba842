//! Shared HTTPS client for model backends and data-source tools.

use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{Body, Client, HeaderMap, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{AdapterError, AdapterResult};

/// Status, headers, and fully buffered body of a reply.
#[derive(Debug)]
pub struct HttpReply {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Buffered response body.
    pub body: Bytes,
}

/// HTTPS client trusting the bundled webpki roots.
#[derive(Clone, Debug)]
pub struct HttpsClient {
    inner: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Default for HttpsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpsClient {
    /// Builds a client with TLS 1.2 and the webpki root store.
    #[must_use]
    pub fn new() -> Self {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                anchor.subject,
                anchor.spki,
                anchor.name_constraints,
            )
        }));

        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let connector = HttpsConnector::from((http, Arc::new(config)));
        Self {
            inner: Client::builder().build::<_, Body>(connector),
        }
    }

    /// POSTs a JSON body and buffers the reply, failing after `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Transport`] on connection failures, timeouts,
    /// or unreadable bodies. Non-2xx statuses are returned, not raised.
    pub async fn post_json(
        &self,
        uri: Uri,
        body: Vec<u8>,
        limit: Duration,
        provider: &str,
    ) -> AdapterResult<HttpReply> {
        let request = Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build {provider} request: {err}"))
            })?;

        self.send(request, limit, provider).await
    }

    /// GETs `uri` with extra headers and buffers the reply, failing after `limit`.
    ///
    /// # Errors
    ///
    /// Same as [`HttpsClient::post_json`].
    pub async fn get(
        &self,
        uri: Uri,
        headers: &[(HeaderName, HeaderValue)],
        limit: Duration,
        provider: &str,
    ) -> AdapterResult<HttpReply> {
        let mut builder = Request::get(uri);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let request = builder.body(Body::empty()).map_err(|err| {
            AdapterError::transport(format!("failed to build {provider} request: {err}"))
        })?;

        self.send(request, limit, provider).await
    }

    async fn send(
        &self,
        request: Request<Body>,
        limit: Duration,
        provider: &str,
    ) -> AdapterResult<HttpReply> {
        let response = timeout(limit, self.inner.request(request))
            .await
            .map_err(|_| AdapterError::transport(format!("{provider} request timed out")))?
            .map_err(|err| AdapterError::transport(format!("{provider} request failed: {err}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body()).await.map_err(|err| {
            AdapterError::transport(format!("failed to read {provider} response: {err}"))
        })?;

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}
