use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use osmolock_core::constants::account_locked_longer_duration_path;
use osmolock_core::error::LockupError;
use osmolock_core::types::AccountLockedResponse;
use osmolock_query::LockupTransport;

use crate::config::LcdConfig;

/// Plain HTTP GET client for a chain's REST (LCD) endpoint.
///
/// Decodes the body with serde_json directly rather than through
/// `reqwest::Response::json` so decode failures are reported separately
/// from transport failures.
pub struct LcdClient {
    base_url: String,
    client: reqwest::Client,
}

impl LcdClient {
    pub fn new(config: &LcdConfig) -> Result<Self, LockupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LockupError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a REST path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LockupError> {
        let url = self.url(path);
        debug!(%url, "LCD request");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LockupError::Transport(format!("connecting to {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LockupError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| LockupError::Transport(format!("reading body from {url}: {e}")))?;
        serde_json::from_str(&body).map_err(|e| LockupError::Decode(format!("{url}: {e}")))
    }
}

#[async_trait]
impl LockupTransport for LcdClient {
    async fn account_locked_longer_duration(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<AccountLockedResponse, LockupError> {
        let resp: AccountLockedResponse =
            self.get(&account_locked_longer_duration_path(address)).await?;
        debug!(chain_id, address, locks = resp.locks.len(), "fetched account locks");
        Ok(resp)
    }
}
