//! `reqwest` implementation of [`Transport`].
//!
//! Request bodies are streamed in fixed-size frames so that part progress
//! can be reported while bytes are still leaving the process.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, ETAG, HeaderValue, USER_AGENT};

use crate::transport::{
    Method, ProgressSink, Transport, TransportError, TransportReply, TransportRequest,
};

/// Size of one streamed body frame.
pub const FRAME_SIZE: usize = 64 * 1024;

const DEFAULT_USER_AGENT: &str = concat!("taskdeck/", env!("CARGO_PKG_VERSION"));

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Bearer token for requests addressed to the API.
    pub api_token: Option<String>,
    pub connect_timeout: Duration,
    /// Whole-request timeout. `None` lets large parts take as long as needed.
    pub request_timeout: Option<Duration>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// HTTP transport backed by a shared `reqwest::Client`.
pub struct HttpTransport {
    http: reqwest::Client,
    api_token: Option<String>,
}

impl HttpTransport {
    /// Builds the HTTP client.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_token: config.api_token.filter(|t| !t.is_empty()),
        })
    }

    async fn execute(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> Result<TransportReply, TransportError> {
        let length = request.body.len();
        let mut builder = match request.method {
            Method::Put => self.http.put(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        builder = builder.header(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.authenticated {
            if let Some(token) = &self.api_token {
                builder = builder.bearer_auth(token);
            }
        }

        let body = match progress {
            Some(sink) => {
                // An explicit length keeps the streamed body out of chunked
                // encoding, which pre-signed PUT URLs do not accept.
                builder = builder.header(CONTENT_LENGTH, length);
                reqwest::Body::wrap_stream(framed_body(request.body, sink))
            }
            None => reqwest::Body::from(request.body),
        };

        let resp = builder
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        let status = resp.status().as_u16();
        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError(describe(&e)))?;

        Ok(TransportReply { status, etag, body })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportReply, TransportError>> + Send + '_>> {
        Box::pin(self.execute(request, progress))
    }
}

/// Splits `body` into frames, reporting the cumulative byte count as each
/// frame is handed to the connection.
fn framed_body(
    body: Bytes,
    sink: ProgressSink,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = body.len();
    let frames: Vec<Bytes> = (0..total)
        .step_by(FRAME_SIZE)
        .map(|start| body.slice(start..(start + FRAME_SIZE).min(total)))
        .collect();

    let mut sent = 0u64;
    stream::iter(frames).map(move |frame| {
        sent += frame.len() as u64;
        sink(sent);
        Ok(frame)
    })
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    struct Captured {
        head: String,
        body: Vec<u8>,
    }

    /// Reads one request: headers, then `Content-Length` bytes of body.
    async fn read_request(stream: &mut TcpStream) -> Captured {
        let mut data = Vec::new();
        let mut buf = vec![0u8; 8192];
        let head_end = loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            data.extend_from_slice(&buf[..n]);
            if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&data[..head_end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while data.len() < head_end + length {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before body");
            data.extend_from_slice(&buf[..n]);
        }
        Captured {
            head,
            body: data[head_end..head_end + length].to_vec(),
        }
    }

    /// Starts a mock HTTP server that answers one request with `response`.
    async fn mock_server(response: String) -> (String, tokio::task::JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let captured = read_request(&mut stream).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
            captured
        });

        (url, handle)
    }

    fn response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn transport(token: Option<&str>) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig {
            api_token: token.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn put_streams_body_and_returns_etag() {
        let (url, handle) = mock_server(response("200 OK", "ETag: \"abc123\"\r\n", "")).await;
        let data: Vec<u8> = (0..200_000).map(|i| (i % 256) as u8).collect();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sink: ProgressSink = Arc::new(move |n| s.lock().unwrap().push(n));

        let reply = transport(Some("secret"))
            .send(
                TransportRequest::put(format!("{url}/part/1"), data.clone()),
                Some(sink),
            )
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.etag.as_deref(), Some("\"abc123\""));

        let captured = handle.await.unwrap();
        assert!(captured.head.starts_with("put /part/1 http/1.1"));
        assert!(captured.head.contains("content-length: 200000"));
        assert!(!captured.head.contains("transfer-encoding"));
        assert!(!captured.head.contains("authorization"));
        assert_eq!(captured.body, data);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 200_000usize.div_ceil(FRAME_SIZE));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), 200_000);
    }

    #[tokio::test]
    async fn authenticated_post_carries_bearer_token() {
        let json = r#"{"upload_info":{"url":"https://s3/put"}}"#;
        let (url, handle) = mock_server(response(
            "200 OK",
            "Content-Type: application/json\r\n",
            json,
        ))
        .await;

        let reply = transport(Some("secret"))
            .send(
                TransportRequest::post(format!("{url}/storage/files"), r#"{"path":"a","size":1}"#)
                    .header("Content-Type", "application/json")
                    .authenticated(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(&reply.body[..], json.as_bytes());

        let captured = handle.await.unwrap();
        assert!(captured.head.starts_with("post /storage/files"));
        assert!(captured.head.contains("authorization: bearer secret"));
        assert!(captured.head.contains("content-type: application/json"));
        assert_eq!(captured.body, br#"{"path":"a","size":1}"#);
    }

    #[tokio::test]
    async fn error_status_is_a_reply() {
        let (url, handle) =
            mock_server(response("403 Forbidden", "", "<Error>AccessDenied</Error>")).await;

        let reply = transport(None)
            .send(TransportRequest::put(url, "x"), None)
            .await
            .unwrap();

        assert_eq!(reply.status, 403);
        assert!(!reply.is_success());
        assert_eq!(reply.etag, None);
        assert!(reply.body_text().contains("AccessDenied"));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = transport(None)
            .send(
                TransportRequest::put(format!("http://127.0.0.1:{port}/x"), "x"),
                None,
            )
            .await
            .unwrap_err();
        assert!(!err.0.is_empty());
    }

    #[test]
    fn empty_token_is_ignored() {
        let t = transport(Some(""));
        assert!(t.api_token.is_none());
    }

    #[tokio::test]
    async fn framed_body_reports_cumulative_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sink: ProgressSink = Arc::new(move |n| s.lock().unwrap().push(n));

        let body = Bytes::from(vec![7u8; FRAME_SIZE * 2 + 10]);
        let frames: Vec<Bytes> = framed_body(body, sink)
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].len(), 10);
        let expected = vec![
            FRAME_SIZE as u64,
            2 * FRAME_SIZE as u64,
            2 * FRAME_SIZE as u64 + 10,
        ];
        assert_eq!(*seen.lock().unwrap(), expected);
    }
}
