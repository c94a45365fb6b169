//! Part Transfer Unit: one `PUT` of one byte range.

use std::sync::Arc;

use bytes::Bytes;
use taskdeck_transfer::{PartResult, PartSpec, ProgressTracker};
use tracing::debug;

use crate::cancel::CancellationBridge;
use crate::error::UploadError;
use crate::transport::{ProgressSink, Transport, TransportRequest};

/// Transfers `body` (the bytes of `part`) to the part's pre-signed URL.
///
/// Byte progress is forwarded to `tracker`, clamped to the part length.
/// Success requires HTTP 200 and a non-empty `ETag`; the ETag is returned
/// verbatim, quotes included.
pub async fn transfer_part(
    transport: &dyn Transport,
    part: &PartSpec,
    body: Bytes,
    tracker: &Arc<ProgressTracker>,
    bridge: &CancellationBridge,
) -> Result<PartResult, UploadError> {
    let number = part.part_number;
    let limit = part.byte_length;

    let sink: ProgressSink = {
        let tracker = Arc::clone(tracker);
        Arc::new(move |sent| tracker.record(number, sent.min(limit)))
    };

    debug!(part = number, bytes = limit, "sending part");
    let request = TransportRequest::put(part.url.clone(), body);
    let reply = bridge
        .run(transport.send(request, Some(sink)))
        .await?
        .map_err(|e| UploadError::Transport {
            part: Some(number),
            message: e.to_string(),
        })?;

    if reply.status != 200 {
        return Err(UploadError::ServerRejected {
            status: reply.status,
            part: Some(number),
        });
    }

    let etag = reply
        .etag
        .filter(|e| !e.trim().is_empty())
        .ok_or(UploadError::MissingETag(number))?;

    tracker.record(number, limit);
    debug!(part = number, %etag, "part done");
    Ok(PartResult {
        part_number: number,
        etag,
    })
}
