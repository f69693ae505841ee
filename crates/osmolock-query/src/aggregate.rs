//! Locked and unlocking totals derived from a lock snapshot.
//!
//! A lock matches a query duration when its whole-second duration equals the
//! query's whole seconds (`Duration::as_secs`, sub-second part dropped).

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use osmolock_core::currency::{CoinPretty, Currency};
use osmolock_core::lock::{AccountLock, LockStatus};

/// Sum of the currently locked (not unlocking) locks of one duration.
#[derive(Clone, Debug, PartialEq)]
pub struct LockedCoin {
    pub amount: CoinPretty,
    /// Contributing lock ids in snapshot order.
    pub lock_ids: Vec<String>,
}

impl LockedCoin {
    pub fn empty(currency: &Currency) -> Self {
        Self {
            amount: CoinPretty::zero(currency.clone()),
            lock_ids: Vec::new(),
        }
    }
}

/// Unlocking locks of one duration that release at the same instant.
#[derive(Clone, Debug, PartialEq)]
pub struct UnlockingCoin {
    pub amount: CoinPretty,
    pub lock_ids: Vec<String>,
    pub end_time: DateTime<Utc>,
}

fn matches_duration(lock: &AccountLock, duration: Duration) -> bool {
    lock.duration_secs == duration.as_secs()
}

pub fn locked_coin_with_duration(
    locks: &[AccountLock],
    currency: &Currency,
    duration: Duration,
) -> LockedCoin {
    let denom = &currency.coin_minimal_denom;
    locks
        .iter()
        .filter(|l| matches_duration(l, duration) && l.status == LockStatus::Locked)
        .fold(LockedCoin::empty(currency), |mut acc, lock| {
            acc.amount = acc.amount.add_raw(&lock.amount_of(denom));
            acc.lock_ids.push(lock.id.clone());
            acc
        })
}

/// Unlocking cohorts for one duration, earliest release first.
pub fn unlocking_coins_with_duration(
    locks: &[AccountLock],
    currency: &Currency,
    duration: Duration,
) -> Vec<UnlockingCoin> {
    let denom = &currency.coin_minimal_denom;
    // Keyed by end time in milliseconds: equal instants share one group and
    // iteration order is ascending.
    let mut groups: BTreeMap<i64, UnlockingCoin> = BTreeMap::new();

    for lock in locks.iter().filter(|l| matches_duration(l, duration)) {
        let LockStatus::Unlocking { end_time } = lock.status else {
            continue;
        };
        let group = groups
            .entry(end_time.timestamp_millis())
            .or_insert_with(|| UnlockingCoin {
                amount: CoinPretty::zero(currency.clone()),
                lock_ids: Vec::new(),
                end_time,
            });
        group.amount = group.amount.add_raw(&lock.amount_of(denom));
        group.lock_ids.push(lock.id.clone());
    }

    groups.into_values().collect()
}
