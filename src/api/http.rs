use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{AnalyzeRequest, AnalyzeResponse, ApiError, ApiResult, ProctorApi, ViolationReport};

/// reqwest-backed client for the proctoring backend.
///
/// Deliberately carries no request timeout: a stalled analyze call keeps the
/// loop's single in-flight slot occupied, which is exactly the condition the
/// liveness watchdog exists to catch.
pub struct HttpProctorApi {
    client: Client,
    base_url: String,
}

impl HttpProctorApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/proctor/{path}", self.base_url)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[async_trait]
impl ProctorApi for HttpProctorApi {
    async fn analyze(&self, request: AnalyzeRequest) -> ApiResult<AnalyzeResponse> {
        let response = self
            .client
            .post(self.endpoint("analyze"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        response
            .json::<AnalyzeResponse>()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn report_violation(&self, report: ViolationReport) -> ApiResult<()> {
        let response = self
            .client
            .post(self.endpoint("violation"))
            .json(&report)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn heartbeat(&self) -> ApiResult<()> {
        let response = self.client.post(self.endpoint("heartbeat")).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let api = HttpProctorApi::new("http://localhost:5000/").unwrap();
        assert_eq!(api.endpoint("analyze"), "http://localhost:5000/proctor/analyze");
    }
}
