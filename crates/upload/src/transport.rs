//! Transport abstraction.
//!
//! Every network exchange of an upload (negotiation, part `PUT`s, finalize)
//! goes through [`Transport::send`]. [`crate::HttpTransport`] implements it
//! with `reqwest`; tests plug in a recording mock.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

/// Receives the cumulative number of body bytes sent for one request.
pub type ProgressSink = Arc<dyn Fn(u64) + Send + Sync>;

/// HTTP method of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Put,
    Post,
}

/// One request to send.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Attach the API credentials. Pre-signed storage URLs carry their own
    /// signature and must be sent without them.
    pub authenticated: bool,
}

impl TransportRequest {
    pub fn put(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Put, url.into(), body.into())
    }

    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Post, url.into(), body.into())
    }

    fn new(method: Method, url: String, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body,
            authenticated: false,
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Marks the request as addressed to the API itself.
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Looks up a header value, case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response to a transport request. Non-2xx statuses are replies, not errors.
#[derive(Debug, Clone, Default)]
pub struct TransportReply {
    pub status: u16,
    pub etag: Option<String>,
    pub body: Bytes,
}

impl TransportReply {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response body as text, lossily decoded and truncated for messages.
    pub fn body_text(&self) -> String {
        const MAX: usize = 512;
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        if text.len() <= MAX {
            return text.to_string();
        }
        let mut end = MAX;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    }
}

/// A request could not be completed (connection, TLS, timeout, ...).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends HTTP-style requests on behalf of the upload pipeline.
pub trait Transport: Send + Sync {
    /// Sends `request`, reporting body bytes sent through `progress`.
    ///
    /// Dropping the returned future abandons the request.
    fn send(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportReply, TransportError>> + Send + '_>>;
}
