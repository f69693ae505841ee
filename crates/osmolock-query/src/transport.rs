use async_trait::async_trait;

use osmolock_core::error::LockupError;
use osmolock_core::types::AccountLockedResponse;

/// Fetches one account's locks from a chain.
///
/// Implementations own retries, timeouts and HTTP details; the query layer
/// only sees a decoded response or an error.
#[async_trait]
pub trait LockupTransport: Send + Sync {
    /// `GET /osmosis/lockup/v1beta1/account_locked_longer_duration/{address}`
    async fn account_locked_longer_duration(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<AccountLockedResponse, LockupError>;
}
