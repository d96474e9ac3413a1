//! Webhook callback delivery.
//!
//! Upload processing is fire-and-forget: the caller gets its results by
//! POST to the callback URL it supplied, whether the pipeline succeeded
//! or failed.

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_session_model::CallbackPayload;
use url::Url;

/// POSTs callback payloads with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct CallbackSender {
    client: reqwest::Client,
}

impl CallbackSender {
    pub fn new(request_timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(request_timeout_ms))
            .build()
            .expect("reqwest client construction is infallible with these options");
        Self { client }
    }

    /// POST the payload to the callback URL, expecting a 2xx.
    pub async fn deliver(&self, callback_url: &str, payload: &CallbackPayload) -> ReelcutResult<()> {
        let url = Url::parse(callback_url)
            .map_err(|e| ReelcutError::delivery(format!("invalid callback URL: {e}")))?;

        tracing::info!(
            url = %url,
            success = payload.clips.is_some(),
            "Delivering callback"
        );

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ReelcutError::delivery(format!("callback request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ReelcutError::delivery(format!(
                "callback endpoint answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}
