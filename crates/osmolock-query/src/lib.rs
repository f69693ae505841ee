//! osmolock-query
//!
//! Read-model over the lockup module's per-account lock query. One
//! [`AccountLockQuery`] per address owns the fetch lifecycle and the current
//! lock snapshot; [`AccountLockRegistry`] hands out those queries, one per
//! address. Locked and unlocking totals are derived on demand and memoized
//! until the snapshot changes.

pub mod aggregate;
pub mod cache;
pub mod chain;
pub mod query;
pub mod registry;
pub mod transport;

pub use aggregate::{
    locked_coin_with_duration, unlocking_coins_with_duration, LockedCoin, UnlockingCoin,
};
pub use cache::{MemoryResponseCache, ResponseCache};
pub use chain::{ChainRegistry, ChainResolver};
pub use query::{AccountLockQuery, Snapshot};
pub use registry::AccountLockRegistry;
pub use transport::LockupTransport;
