//! Single-shot upload: the whole file in one `PUT`.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use taskdeck_transfer::{ProgressTracker, SourceFile};
use tracing::info;

use crate::cancel::CancellationBridge;
use crate::error::UploadError;
use crate::state::{StateMachine, UploadState};
use crate::transport::{ProgressSink, Transport, TransportRequest};

/// Sends the whole of `source` to `url`.
///
/// `headers` from the negotiation are applied verbatim. Success requires
/// HTTP 200; no ETag is needed.
pub async fn upload_simple(
    transport: &dyn Transport,
    source: &SourceFile,
    url: &str,
    headers: &HashMap<String, String>,
    tracker: &Arc<ProgressTracker>,
    bridge: &CancellationBridge,
    machine: &mut StateMachine,
) -> Result<(), UploadError> {
    bridge.check()?;
    machine.advance(UploadState::TransferringPart(1));
    tracker.begin_part(1);

    let body = read_source(source).await?;
    bridge.check()?;

    let mut names: Vec<&String> = headers.keys().collect();
    names.sort();
    let mut request = TransportRequest::put(url, body);
    for name in names {
        request = request.header(name.as_str(), headers[name].as_str());
    }

    let sink: ProgressSink = {
        let tracker = Arc::clone(tracker);
        Arc::new(move |sent| tracker.record(1, sent))
    };

    let reply = bridge
        .run_final(transport.send(request, Some(sink)))
        .await?
        .map_err(|e| UploadError::Transport {
            part: None,
            message: e.to_string(),
        })?;

    if reply.status != 200 {
        return Err(UploadError::ServerRejected {
            status: reply.status,
            part: None,
        });
    }

    tracker.record(1, source.size());
    machine.advance(UploadState::AllPartsDone);
    info!(bytes = source.size(), "single-shot upload sent");
    Ok(())
}

async fn read_source(source: &SourceFile) -> Result<Bytes, UploadError> {
    let source = source.clone();
    let data = tokio::task::spawn_blocking(move || source.read_all())
        .await
        .map_err(|e| UploadError::SourceRead(format!("read task failed: {e}")))??;
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockReply, MockTransport, ok, status};
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn source(dir: &TempDir, data: &[u8]) -> SourceFile {
        let path: PathBuf = dir.path().join("file.txt");
        std::fs::write(&path, data).unwrap();
        SourceFile::open(&path).unwrap()
    }

    fn live_bridge() -> CancellationBridge {
        CancellationBridge::new(CancellationToken::new())
    }

    async fn send(
        transport: &MockTransport,
        src: &SourceFile,
        headers: &HashMap<String, String>,
        tracker: &Arc<ProgressTracker>,
        bridge: &CancellationBridge,
        machine: &mut StateMachine,
    ) -> Result<(), UploadError> {
        upload_simple(transport, src, "https://s3/put", headers, tracker, bridge, machine).await
    }

    #[tokio::test]
    async fn puts_whole_file_with_headers() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, b"hello world!");
        let transport = MockTransport::new(vec![ok()]);
        let tracker = Arc::new(ProgressTracker::new("u1", src.size()));
        let mut machine = StateMachine::new();
        machine.advance(UploadState::Negotiating);
        let headers = HashMap::from([
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("x-amz-meta-owner".to_string(), "ops".to_string()),
        ]);

        send(&transport, &src, &headers, &tracker, &live_bridge(), &mut machine)
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(&requests[0].body[..], b"hello world!");
        assert_eq!(requests[0].header_value("Content-Type"), Some("text/plain"));
        assert_eq!(requests[0].header_value("x-amz-meta-owner"), Some("ops"));
        assert!(!requests[0].authenticated);
        assert_eq!(machine.current(), UploadState::AllPartsDone);
        assert_eq!(tracker.snapshot().transferred_bytes, 12);
    }

    #[tokio::test]
    async fn non_200_is_rejected() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, b"abc");
        let transport = MockTransport::new(vec![status(403)]);
        let tracker = Arc::new(ProgressTracker::new("u1", 3));
        let mut machine = StateMachine::new();
        machine.advance(UploadState::Negotiating);

        let err = send(&transport, &src, &HashMap::new(), &tracker, &live_bridge(), &mut machine)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::ServerRejected {
                status: 403,
                part: None
            }
        ));
    }

    #[tokio::test]
    async fn cancelled_before_start_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, b"abc");
        let transport = MockTransport::new(vec![ok()]);
        let tracker = Arc::new(ProgressTracker::new("u1", 3));
        let bridge = live_bridge();
        bridge.cancel();

        let mut machine = StateMachine::new();
        let err = send(&transport, &src, &HashMap::new(), &tracker, &bridge, &mut machine)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Aborted));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn transport_error_has_no_part_number() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, b"abc");
        let transport = MockTransport::new(vec![MockReply::Fail("connection reset".into())]);
        let tracker = Arc::new(ProgressTracker::new("u1", 3));
        let mut machine = StateMachine::new();
        machine.advance(UploadState::Negotiating);

        let err = send(&transport, &src, &HashMap::new(), &tracker, &live_bridge(), &mut machine)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        match err {
            UploadError::Transport { part, message } => {
                assert_eq!(part, None);
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_during_put_aborts() {
        let dir = TempDir::new().unwrap();
        let src = source(&dir, b"0123456789");
        let token = CancellationToken::new();
        let transport = MockTransport::new(vec![MockReply::CancelThenHang(token.clone())]);
        let tracker = Arc::new(ProgressTracker::new("u1", 10));
        tracker.set_parts(vec![10]);
        tracker.start();
        let bridge = CancellationBridge::new(token);
        let mut machine = StateMachine::new();
        machine.advance(UploadState::Negotiating);

        let err = send(&transport, &src, &HashMap::new(), &tracker, &bridge, &mut machine)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Aborted));
        assert_eq!(transport.request_count(), 1);
        assert!(tracker.percent() < 100.0);
        assert_eq!(machine.current(), UploadState::TransferringPart(1));
    }
}
