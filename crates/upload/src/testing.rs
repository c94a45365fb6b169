//! Recording mock transport shared by the unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::transport::{
    ProgressSink, Transport, TransportError, TransportReply, TransportRequest,
};

/// Scripted behaviour for one request, consumed in order.
pub(crate) enum MockReply {
    Reply(TransportReply),
    Fail(String),
    /// Fires the token, then replies. Cancellation lands right after the
    /// request completed.
    CancelThenReply(CancellationToken, TransportReply),
    /// Fires the token and never replies. Cancellation lands mid-transfer.
    CancelThenHang(CancellationToken),
}

pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: TransportRequest,
        progress: Option<ProgressSink>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportReply, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let len = request.body.len() as u64;
            self.requests.lock().unwrap().push(request);
            let next = self.replies.lock().unwrap().pop_front();

            let report = |sink: &Option<ProgressSink>| {
                if let Some(sink) = sink {
                    sink(len / 2);
                    sink(len);
                }
            };

            match next {
                Some(MockReply::Reply(reply)) => {
                    report(&progress);
                    Ok(reply)
                }
                Some(MockReply::Fail(msg)) => Err(TransportError(msg)),
                Some(MockReply::CancelThenReply(token, reply)) => {
                    report(&progress);
                    token.cancel();
                    Ok(reply)
                }
                Some(MockReply::CancelThenHang(token)) => {
                    if let Some(sink) = &progress {
                        sink(len / 2);
                    }
                    token.cancel();
                    std::future::pending().await
                }
                None => Err(TransportError("no scripted reply".into())),
            }
        })
    }
}

pub(crate) fn ok() -> MockReply {
    MockReply::Reply(TransportReply {
        status: 200,
        etag: None,
        body: Bytes::new(),
    })
}

pub(crate) fn status(code: u16) -> MockReply {
    MockReply::Reply(TransportReply {
        status: code,
        etag: None,
        body: Bytes::from_static(b"<Error><Code>Denied</Code></Error>"),
    })
}

pub(crate) fn etag_reply(etag: &str) -> TransportReply {
    TransportReply {
        status: 200,
        etag: Some(etag.to_string()),
        body: Bytes::new(),
    }
}

pub(crate) fn etag(etag: &str) -> MockReply {
    MockReply::Reply(etag_reply(etag))
}

pub(crate) fn json_reply(value: serde_json::Value) -> MockReply {
    MockReply::Reply(TransportReply {
        status: 200,
        etag: None,
        body: Bytes::from(value.to_string()),
    })
}

pub(crate) fn simple_negotiation(url: &str, headers: &[(&str, &str)]) -> MockReply {
    let headers: serde_json::Map<String, serde_json::Value> = headers
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect();
    json_reply(serde_json::json!({
        "upload_info": { "url": url, "headers": headers }
    }))
}

pub(crate) fn multipart_negotiation(count: u32, part_size: u64, finalize: &str) -> MockReply {
    let parts: Vec<serde_json::Value> = (1..=count)
        .map(|part| {
            serde_json::json!({
                "part": part,
                "n_bytes": part_size,
                "url": format!("https://s3/part/{part}"),
            })
        })
        .collect();
    json_reply(serde_json::json!({
        "upload_info": {
            "type": "multipart",
            "urls": { "parts": parts, "finalize": finalize }
        }
    }))
}
