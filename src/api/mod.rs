//! Wire contract with the proctoring backend.
//!
//! Three endpoints: `analyze` (frame in, violation tags out), `violation`
//! (fire-and-forget report), `heartbeat` (fire-and-forget liveness ping).
//! The trait is the seam the monitor is tested through.

mod http;

pub use http::HttpProctorApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ViolationType;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    /// JPEG still as a data URL.
    pub image: String,
    pub enable_phone: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub violations: Vec<ViolationType>,
    /// Advisory suspicion score computed server-side; surfaced in the status
    /// readout, never used for policy.
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    #[serde(rename = "type")]
    pub kind: ViolationType,
    /// Evidence still as a data URL; only attached for severe types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[async_trait]
pub trait ProctorApi: Send + Sync {
    async fn analyze(&self, request: AnalyzeRequest) -> ApiResult<AnalyzeResponse>;
    async fn report_violation(&self, report: ViolationReport) -> ApiResult<()>;
    async fn heartbeat(&self) -> ApiResult<()>;
}
