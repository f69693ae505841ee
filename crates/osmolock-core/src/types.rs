use serde::{Deserialize, Serialize};

// ── Wire types ───────────────────────────────────────────────────────────────

/// A `(denom, amount)` pair as the chain's REST API encodes it. The amount is
/// an integer in the currency's minimal denomination, carried as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

/// One period lock exactly as returned by the lockup module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    #[serde(rename = "ID")]
    pub id: String,
    /// Whole seconds followed by `s`, e.g. `"86400s"`.
    pub duration: String,
    /// RFC 3339 timestamp; the zero time means the lock is not unlocking.
    pub end_time: String,
    #[serde(default)]
    pub coins: Vec<Coin>,
}

/// Body of `GET /osmosis/lockup/v1beta1/account_locked_longer_duration/{address}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLockedResponse {
    #[serde(default)]
    pub locks: Vec<Lock>,
}

impl AccountLockedResponse {
    /// Every denomination appearing in any lock, deduplicated, in order of
    /// first appearance.
    pub fn denoms(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for coin in self.locks.iter().flat_map(|l| l.coins.iter()) {
            if !out.iter().any(|d| d == &coin.denom) {
                out.push(coin.denom.clone());
            }
        }
        out
    }
}
