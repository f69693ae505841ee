//! Parsed view of a wire [`Lock`].
//!
//! The REST API hands back durations, timestamps and amounts as strings.
//! Everything is parsed once, when a response arrives, so a malformed value
//! surfaces as an error instead of silently landing in the wrong bucket.

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

use crate::currency::parse_decimal;
use crate::error::LockupError;
use crate::types::{AccountLockedResponse, Lock};

// ── LockStatus ───────────────────────────────────────────────────────────────

/// Every lock is exactly one of these, decided by its `end_time` alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockStatus {
    /// Tokens are bonded; no unlock has been started.
    Locked,
    /// Unlock started; tokens release at `end_time`.
    Unlocking { end_time: DateTime<Utc> },
}

// ── AccountLock ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct AccountLock {
    pub id: String,
    /// Lock duration in whole seconds.
    pub duration_secs: u64,
    pub status: LockStatus,
    /// `(minimal denom, amount)` in wire order.
    pub coins: Vec<(String, BigDecimal)>,
}

impl AccountLock {
    pub fn parse(lock: &Lock) -> Result<Self, LockupError> {
        let duration_secs = parse_duration_secs(&lock.duration)?;
        let end_time = parse_end_time(&lock.end_time)?;
        let status = if end_time.timestamp_millis() <= 0 {
            LockStatus::Locked
        } else {
            LockStatus::Unlocking { end_time }
        };
        let coins = lock
            .coins
            .iter()
            .map(|c| Ok((c.denom.clone(), parse_amount(&c.denom, &c.amount)?)))
            .collect::<Result<Vec<_>, LockupError>>()?;

        Ok(Self {
            id: lock.id.clone(),
            duration_secs,
            status,
            coins,
        })
    }

    /// Parse every lock of a response, failing on the first malformed one.
    pub fn parse_all(response: &AccountLockedResponse) -> Result<Vec<Self>, LockupError> {
        response.locks.iter().map(Self::parse).collect()
    }

    pub fn is_unlocking(&self) -> bool {
        matches!(self.status, LockStatus::Unlocking { .. })
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        match self.status {
            LockStatus::Locked => None,
            LockStatus::Unlocking { end_time } => Some(end_time),
        }
    }

    /// Total held in `minimal_denom`; zero when the lock has no such coin.
    pub fn amount_of(&self, minimal_denom: &str) -> BigDecimal {
        self.coins
            .iter()
            .filter(|(denom, _)| denom == minimal_denom)
            .fold(BigDecimal::zero(), |acc, (_, amount)| acc + amount)
    }
}

// ── Parsers ──────────────────────────────────────────────────────────────────

/// Parse `"86400s"` into whole seconds. A fractional part (`"86400.75s"`) is
/// validated and then truncated, never rounded.
pub fn parse_duration_secs(value: &str) -> Result<u64, LockupError> {
    let invalid = || LockupError::InvalidDuration(value.to_string());

    let body = value.strip_suffix('s').ok_or_else(invalid)?;
    let (whole, frac) = match body.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (body, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
    }
    whole.parse().map_err(|_| invalid())
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_end_time(value: &str) -> Result<DateTime<Utc>, LockupError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| LockupError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a coin amount (integer or decimal string).
pub fn parse_amount(denom: &str, value: &str) -> Result<BigDecimal, LockupError> {
    parse_decimal(denom, value)
}
