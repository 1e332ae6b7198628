use crate::config::DownstreamConfig;
use crate::error::UpstreamError;
use serde_json::value::RawValue;
use std::time::Duration;

/// Client for the slow downstream dependency.
#[derive(Clone, Debug)]
pub struct Downstream {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl Downstream {
    pub fn new(config: &DownstreamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/slow", config.base_url.trim_end_matches('/')),
            timeout: config.timeout,
        }
    }

    /// Call `GET /slow` and return the body untouched, as long as it is JSON.
    pub async fn call(&self, request_id: &str) -> Result<Box<RawValue>, UpstreamError> {
        let res = self
            .client
            .get(&self.url)
            .query(&[("request_id", request_id)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = res.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = res.text().await.map_err(|err| self.classify(err))?;
        Ok(RawValue::from_string(body)?)
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Transport(err)
        }
    }
}
