//! Upload negotiation: asks the storage service how a file should be sent.

use taskdeck_protocol::{CREATE_FILE_PATH, CreateFileRequest, CreateFileResponse, UploadInfo};
use taskdeck_transfer::UploadPlan;
use tracing::{debug, info};

use crate::error::UploadError;
use crate::transport::{Transport, TransportRequest};

/// Issues the create-file request and turns the answer into an [`UploadPlan`].
pub struct Negotiator<'a> {
    transport: &'a dyn Transport,
    api_url: &'a str,
}

impl<'a> Negotiator<'a> {
    pub fn new(transport: &'a dyn Transport, api_url: &'a str) -> Self {
        Self { transport, api_url }
    }

    /// URL of the create-file endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), CREATE_FILE_PATH)
    }

    /// Negotiates an upload of `size` bytes to `path`.
    ///
    /// Every failure, including a malformed or inconsistent plan, is reported
    /// as [`UploadError::NegotiationFailed`].
    pub async fn negotiate(&self, path: &str, size: u64) -> Result<UploadPlan, UploadError> {
        let payload = CreateFileRequest {
            path: path.to_string(),
            size,
        };
        let body = serde_json::to_vec(&payload).map_err(|e| failed(None, e))?;
        let request = TransportRequest::post(self.endpoint(), body)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .authenticated();

        debug!(path, size, "negotiating upload");
        let reply = self
            .transport
            .send(request, None)
            .await
            .map_err(|e| failed(None, e))?;

        if !reply.is_success() {
            return Err(failed(Some(reply.status), reply.body_text()));
        }

        let response: CreateFileResponse =
            serde_json::from_slice(&reply.body).map_err(|e| failed(Some(reply.status), e))?;
        let plan = plan_from_info(response.upload_info, size)?;
        info!(strategy = ?plan.strategy(), parts = plan.part_count(), "upload negotiated");
        Ok(plan)
    }
}

/// Maps the service's upload info onto a validated plan.
pub fn plan_from_info(info: UploadInfo, size: u64) -> Result<UploadPlan, UploadError> {
    if info.is_multipart() {
        let urls = info
            .urls
            .ok_or_else(|| failed(None, "multipart upload without part URLs"))?;
        UploadPlan::multipart(urls.parts, urls.finalize, size).map_err(|e| failed(None, e))
    } else {
        let url = info
            .url
            .ok_or_else(|| failed(None, "simple upload without a URL"))?;
        UploadPlan::simple(url, info.headers).map_err(|e| failed(None, e))
    }
}

fn failed(status: Option<u16>, message: impl ToString) -> UploadError {
    UploadError::NegotiationFailed {
        status,
        message: message.to_string(),
    }
}
