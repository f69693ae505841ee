use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use osmolock_core::constants::account_locked_longer_duration_path;
use osmolock_core::currency::Currency;
use osmolock_core::error::LockupError;
use osmolock_core::lock::AccountLock;
use osmolock_core::types::AccountLockedResponse;

use crate::aggregate::{
    locked_coin_with_duration, unlocking_coins_with_duration, LockedCoin, UnlockingCoin,
};
use crate::cache::ResponseCache;
use crate::chain::ChainResolver;
use crate::transport::LockupTransport;

/// The locks of one account at one point in time. Replaced wholesale.
#[derive(Debug)]
pub struct Snapshot {
    pub locks: Vec<AccountLock>,
    /// Increments on every replacement; starts at 1.
    pub version: u64,
    pub received_at: DateTime<Utc>,
}

type MemoKey = (Currency, Duration);

/// Where a response being installed came from.
#[derive(Clone, Copy, Debug)]
enum Source {
    /// Restored at construction; not written back.
    Cache,
    /// Handed in through [`AccountLockQuery::apply_response`].
    Pushed,
    /// Returned by the fetch with this sequence number.
    Fetch(u64),
}

#[derive(Default)]
struct ViewState {
    snapshot: Option<Arc<Snapshot>>,
    locked: HashMap<MemoKey, Arc<LockedCoin>>,
    unlocking: HashMap<MemoKey, Arc<Vec<UnlockingCoin>>>,
    last_error: Option<LockupError>,
}

/// Lock data for one address on one chain.
///
/// Holds the latest snapshot and memoized aggregates over it. Derived views
/// never block on the network: before the first response they report an
/// empty account, and after a failed fetch they keep serving the previous
/// snapshot.
pub struct AccountLockQuery {
    chain_id: String,
    address: String,
    resolver: Arc<dyn ChainResolver>,
    transport: Arc<dyn LockupTransport>,
    cache: Arc<dyn ResponseCache>,
    state: RwLock<ViewState>,
    fetch_seq: AtomicU64,
    version_tx: watch::Sender<u64>,
}

impl AccountLockQuery {
    /// Create the query, restoring the last cached response for this address
    /// if the cache has one.
    pub fn new(
        chain_id: impl Into<String>,
        address: impl Into<String>,
        resolver: Arc<dyn ChainResolver>,
        transport: Arc<dyn LockupTransport>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        let (version_tx, _) = watch::channel(0);
        let query = Self {
            chain_id: chain_id.into(),
            address: address.into(),
            resolver,
            transport,
            cache,
            state: RwLock::new(ViewState::default()),
            fetch_seq: AtomicU64::new(0),
            version_tx,
        };

        if query.is_fetchable() {
            if let Some(cached) = query.cache.get(&query.cache_key()) {
                match query.install(&cached, Source::Cache) {
                    Ok(version) => debug!(
                        chain_id = %query.chain_id,
                        address = %query.address,
                        version = version.unwrap_or_default(),
                        "restored lock snapshot from cache"
                    ),
                    Err(e) => warn!(
                        chain_id = %query.chain_id,
                        address = %query.address,
                        error = %e,
                        "ignoring unreadable cached lock response"
                    ),
                }
            }
        }
        query
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// An empty address would make the endpoint return every account's
    /// locks, so it never fetches. Any other string is passed through.
    pub fn is_fetchable(&self) -> bool {
        !self.address.is_empty()
    }

    fn cache_key(&self) -> String {
        format!(
            "{}{}",
            self.chain_id,
            account_locked_longer_duration_path(&self.address)
        )
    }

    // ── Fetch lifecycle ──────────────────────────────────────────────────────

    /// Fetch and apply the account's current locks.
    ///
    /// Returns `Ok(true)` when a new snapshot was applied and `Ok(false)` when
    /// nothing was applied: the address is empty, or a later fetch was started
    /// while this one was in flight. On error the previous snapshot is kept.
    pub async fn fetch(&self) -> Result<bool, LockupError> {
        if !self.is_fetchable() {
            debug!(chain_id = %self.chain_id, "empty address, lock fetch disabled");
            return Ok(false);
        }

        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self
            .transport
            .account_locked_longer_duration(&self.chain_id, &self.address)
            .await;

        if self.fetch_seq.load(Ordering::SeqCst) != seq {
            warn!(
                chain_id = %self.chain_id,
                address = %self.address,
                "discarding superseded lock response"
            );
            return Ok(false);
        }

        match result {
            Ok(response) => self.apply(response, Source::Fetch(seq)),
            Err(e) => {
                warn!(
                    chain_id = %self.chain_id,
                    address = %self.address,
                    error = %e,
                    "lock fetch failed, keeping previous snapshot"
                );
                self.state.write().last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Post-process and store a response: register its denominations with
    /// the chain, write it to the cache and replace the snapshot.
    ///
    /// A response with any malformed lock is rejected whole and the current
    /// snapshot stays in place.
    pub fn apply_response(&self, response: AccountLockedResponse) -> Result<(), LockupError> {
        self.apply(response, Source::Pushed).map(|_| ())
    }

    fn apply(&self, response: AccountLockedResponse, source: Source) -> Result<bool, LockupError> {
        let installed = self.install(&response, source).inspect_err(|e| {
            warn!(
                chain_id = %self.chain_id,
                address = %self.address,
                error = %e,
                "rejecting malformed lock response"
            );
            self.state.write().last_error = Some(e.clone());
        })?;

        match installed {
            Some(version) => {
                info!(
                    chain_id = %self.chain_id,
                    address = %self.address,
                    version,
                    "lock snapshot updated"
                );
                Ok(true)
            }
            None => {
                warn!(
                    chain_id = %self.chain_id,
                    address = %self.address,
                    "discarding superseded lock response"
                );
                Ok(false)
            }
        }
    }

    /// Replace the snapshot. Returns `Ok(None)` when a fetch response lost the
    /// race to a newer fetch; that check, the snapshot swap, the cache write
    /// and the version signal all happen under the state write lock.
    fn install(
        &self,
        response: &AccountLockedResponse,
        source: Source,
    ) -> Result<Option<u64>, LockupError> {
        let locks = AccountLock::parse_all(response)?;

        let denoms = response.denoms();
        if !denoms.is_empty() {
            self.resolver.add_unknown_currencies(&self.chain_id, &denoms);
        }

        let mut state = self.state.write();
        if let Source::Fetch(seq) = source {
            if self.fetch_seq.load(Ordering::SeqCst) != seq {
                return Ok(None);
            }
        }

        let version = state.snapshot.as_ref().map_or(0, |s| s.version) + 1;
        state.snapshot = Some(Arc::new(Snapshot {
            locks,
            version,
            received_at: Utc::now(),
        }));
        state.locked.clear();
        state.unlocking.clear();
        state.last_error = None;
        if !matches!(source, Source::Cache) {
            self.cache.put(&self.cache_key(), response.clone());
        }
        self.version_tx.send_replace(version);
        Ok(Some(version))
    }

    // ── Snapshot observation ─────────────────────────────────────────────────

    pub fn has_response(&self) -> bool {
        self.state.read().snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.state.read().snapshot.clone()
    }

    /// Current snapshot version; 0 before any response.
    pub fn version(&self) -> u64 {
        *self.version_tx.borrow()
    }

    /// Error from the most recent failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<LockupError> {
        self.state.read().last_error.clone()
    }

    /// Receiver that changes to the new version each time the snapshot is
    /// replaced. Derived views should be re-read when it ticks.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    // ── Derived views ────────────────────────────────────────────────────────

    /// Currently locked amount of `currency` in locks of `duration`.
    ///
    /// Equal arguments return the same `Arc` until the snapshot changes.
    pub fn get_locked_coin_with_duration(
        &self,
        currency: &Currency,
        duration: Duration,
    ) -> Arc<LockedCoin> {
        let key = (currency.clone(), duration);
        if let Some(hit) = self.state.read().locked.get(&key) {
            return Arc::clone(hit);
        }

        let mut state = self.state.write();
        let locks = state.snapshot.clone();
        let entry = state.locked.entry(key).or_insert_with(|| {
            debug!(
                address = %self.address,
                denom = %currency.coin_minimal_denom,
                secs = duration.as_secs(),
                "computing locked aggregate"
            );
            let locks = locks.as_deref().map_or(&[][..], |s| &s.locks[..]);
            Arc::new(locked_coin_with_duration(locks, currency, duration))
        });
        Arc::clone(entry)
    }

    /// Unlocking cohorts of `currency` in locks of `duration`, grouped by
    /// release time and sorted earliest first.
    ///
    /// Equal arguments return the same `Arc` until the snapshot changes.
    pub fn get_unlocking_coin_with_duration(
        &self,
        currency: &Currency,
        duration: Duration,
    ) -> Arc<Vec<UnlockingCoin>> {
        let key = (currency.clone(), duration);
        if let Some(hit) = self.state.read().unlocking.get(&key) {
            return Arc::clone(hit);
        }

        let mut state = self.state.write();
        let locks = state.snapshot.clone();
        let entry = state.unlocking.entry(key).or_insert_with(|| {
            debug!(
                address = %self.address,
                denom = %currency.coin_minimal_denom,
                secs = duration.as_secs(),
                "computing unlocking aggregate"
            );
            let locks = locks.as_deref().map_or(&[][..], |s| &s.locks[..]);
            Arc::new(unlocking_coins_with_duration(locks, currency, duration))
        });
        Arc::clone(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryResponseCache;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use osmolock_core::types::{Coin, Lock};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const DAY: Duration = Duration::from_secs(86_400);

    // ── Test doubles ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<AccountLockedResponse, LockupError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<Result<AccountLockedResponse, LockupError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LockupTransport for ScriptedTransport {
        async fn account_locked_longer_duration(
            &self,
            _chain_id: &str,
            _address: &str,
        ) -> Result<AccountLockedResponse, LockupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(LockupError::Other("no scripted reply".into())))
        }
    }

    #[derive(Default)]
    struct RecordingResolver {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ChainResolver for RecordingResolver {
        fn add_unknown_currencies(&self, _chain_id: &str, denoms: &[String]) {
            self.calls.lock().push(denoms.to_vec());
        }

        fn find_currency(&self, _chain_id: &str, _minimal_denom: &str) -> Option<Currency> {
            None
        }
    }

    // ── Fixtures ─────────────────────────────────────────────────────────────

    fn osmo() -> Currency {
        Currency::new("OSMO", "uosmo", 6)
    }

    fn lock(id: &str, end_time: &str, coins: &[(&str, &str)]) -> Lock {
        Lock {
            id: id.into(),
            duration: "86400s".into(),
            end_time: end_time.into(),
            coins: coins.iter().map(|(d, a)| Coin::new(*d, *a)).collect(),
        }
    }

    fn response(locks: Vec<Lock>) -> AccountLockedResponse {
        AccountLockedResponse { locks }
    }

    fn build(
        address: &str,
        transport: Arc<ScriptedTransport>,
    ) -> (AccountLockQuery, Arc<RecordingResolver>, Arc<MemoryResponseCache>) {
        let resolver = Arc::new(RecordingResolver::default());
        let cache = Arc::new(MemoryResponseCache::new());
        let q = AccountLockQuery::new(
            "osmosis-1",
            address,
            resolver.clone(),
            transport,
            cache.clone(),
        );
        (q, resolver, cache)
    }

    // ── Tests ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_address_never_fetches() {
        let transport = ScriptedTransport::with(vec![Ok(response(vec![]))]);
        let (q, _, _) = build("", transport.clone());

        assert!(!q.is_fetchable());
        assert!(!q.fetch().await.unwrap());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(!q.has_response());
    }

    #[tokio::test]
    async fn invalid_looking_address_still_fetches() {
        let transport = ScriptedTransport::with(vec![Ok(response(vec![]))]);
        let (q, _, _) = build("not-a-bech32-address", transport.clone());

        assert!(q.fetch().await.unwrap());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn views_before_first_response_are_empty() {
        let (q, _, _) = build("osmo1a", ScriptedTransport::with(vec![]));

        let locked = q.get_locked_coin_with_duration(&osmo(), DAY);
        assert!(locked.amount.is_zero());
        assert_eq!(locked.amount.currency(), &osmo());
        assert!(locked.lock_ids.is_empty());
        assert!(q.get_unlocking_coin_with_duration(&osmo(), DAY).is_empty());
        assert_eq!(q.version(), 0);
    }

    #[tokio::test]
    async fn fetch_registers_deduplicated_denoms_every_time() {
        let body = response(vec![
            lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "1"), ("gamm/pool/1", "2")]),
            lock("2", "0001-01-01T00:00:00Z", &[("uosmo", "3")]),
            lock("3", "2030-01-01T00:00:00Z", &[("gamm/pool/1", "4")]),
        ]);
        let transport = ScriptedTransport::with(vec![Ok(body.clone()), Ok(body)]);
        let (q, resolver, _) = build("osmo1a", transport);

        q.fetch().await.unwrap();
        q.fetch().await.unwrap();

        let calls = resolver.calls.lock();
        assert_eq!(calls.len(), 2, "registration runs on every response");
        for call in calls.iter() {
            assert_eq!(call, &vec!["uosmo".to_string(), "gamm/pool/1".to_string()]);
        }
    }

    #[tokio::test]
    async fn derived_views_follow_snapshot() {
        let transport = ScriptedTransport::with(vec![Ok(response(vec![
            lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "100")]),
            lock("2", "2030-01-01T00:00:00Z", &[("uosmo", "100")]),
            lock("3", "2030-01-01T00:00:00Z", &[("uosmo", "50")]),
        ]))]);
        let (q, _, _) = build("osmo1a", transport);
        q.fetch().await.unwrap();

        let locked = q.get_locked_coin_with_duration(&osmo(), DAY);
        assert_eq!(locked.amount.raw_amount(), &BigDecimal::from(100));
        assert_eq!(locked.lock_ids, vec!["1"]);

        let unlocking = q.get_unlocking_coin_with_duration(&osmo(), DAY);
        assert_eq!(unlocking.len(), 1);
        assert_eq!(unlocking[0].amount.raw_amount(), &BigDecimal::from(150));
        assert_eq!(unlocking[0].lock_ids, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn repeated_calls_are_memoized_until_snapshot_changes() {
        let transport = ScriptedTransport::with(vec![
            Ok(response(vec![lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "5")])])),
            Ok(response(vec![lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "9")])])),
        ]);
        let (q, _, _) = build("osmo1a", transport);
        q.fetch().await.unwrap();

        let a = q.get_locked_coin_with_duration(&osmo(), DAY);
        let b = q.get_locked_coin_with_duration(&osmo(), DAY);
        assert!(Arc::ptr_eq(&a, &b));
        let u1 = q.get_unlocking_coin_with_duration(&osmo(), DAY);
        let u2 = q.get_unlocking_coin_with_duration(&osmo(), DAY);
        assert!(Arc::ptr_eq(&u1, &u2));

        // A different duration is a different memo entry.
        let other = q.get_locked_coin_with_duration(&osmo(), DAY * 7);
        assert!(!Arc::ptr_eq(&a, &other));

        q.fetch().await.unwrap();
        let c = q.get_locked_coin_with_duration(&osmo(), DAY);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.amount.raw_amount(), &BigDecimal::from_str("9").unwrap());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let transport = ScriptedTransport::with(vec![
            Ok(response(vec![lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "5")])])),
            Err(LockupError::Transport("connection refused".into())),
        ]);
        let (q, _, _) = build("osmo1a", transport);
        q.fetch().await.unwrap();
        let before = q.get_locked_coin_with_duration(&osmo(), DAY);

        let err = q.fetch().await.unwrap_err();
        assert_eq!(err, LockupError::Transport("connection refused".into()));
        assert_eq!(q.last_error(), Some(err));
        assert_eq!(q.version(), 1);

        let after = q.get_locked_coin_with_duration(&osmo(), DAY);
        assert!(Arc::ptr_eq(&before, &after), "stale views stay valid");
    }

    #[tokio::test]
    async fn malformed_response_is_rejected_whole() {
        let transport = ScriptedTransport::with(vec![
            Ok(response(vec![lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "5")])])),
            Ok(response(vec![
                lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "5")]),
                lock("2", "yesterday", &[("uatom", "5")]),
            ])),
        ]);
        let (q, resolver, _) = build("osmo1a", transport);
        q.fetch().await.unwrap();

        let err = q.fetch().await.unwrap_err();
        assert!(matches!(err, LockupError::InvalidTimestamp { .. }));
        assert_eq!(q.version(), 1);
        assert_eq!(resolver.calls.lock().len(), 1, "no registration for rejected data");
        assert_eq!(q.snapshot().unwrap().locks.len(), 1);
    }

    #[tokio::test]
    async fn successful_fetch_clears_last_error() {
        let transport = ScriptedTransport::with(vec![
            Err(LockupError::HttpStatus { status: 502, url: "x".into() }),
            Ok(response(vec![])),
        ]);
        let (q, _, _) = build("osmo1a", transport);
        assert!(q.fetch().await.is_err());
        assert!(q.last_error().is_some());

        q.fetch().await.unwrap();
        assert!(q.last_error().is_none());
        assert!(q.has_response());
    }

    #[tokio::test]
    async fn accepted_response_is_cached_and_restored() {
        let body = response(vec![lock("1", "0001-01-01T00:00:00Z", &[("uosmo", "5")])]);
        let transport = ScriptedTransport::with(vec![Ok(body.clone())]);
        let (q, _, cache) = build("osmo1a", transport);
        q.fetch().await.unwrap();
        assert_eq!(
            cache.get("osmosis-1/osmosis/lockup/v1beta1/account_locked_longer_duration/osmo1a"),
            Some(body)
        );

        let restored = AccountLockQuery::new(
            "osmosis-1",
            "osmo1a",
            Arc::new(RecordingResolver::default()),
            ScriptedTransport::with(vec![]),
            cache,
        );
        assert!(restored.has_response());
        let locked = restored.get_locked_coin_with_duration(&osmo(), DAY);
        assert_eq!(locked.lock_ids, vec!["1"]);
    }

    #[tokio::test]
    async fn subscribers_see_each_new_version() {
        let transport = ScriptedTransport::with(vec![Ok(response(vec![])), Ok(response(vec![]))]);
        let (q, _, _) = build("osmo1a", transport);
        let mut rx = q.subscribe();

        q.fetch().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);

        q.fetch().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
        assert_eq!(q.snapshot().unwrap().version, 2);
    }

    // ── Superseded fetches ───────────────────────────────────────────────────

    struct GatedTransport {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LockupTransport for GatedTransport {
        async fn account_locked_longer_duration(
            &self,
            _chain_id: &str,
            _address: &str,
        ) -> Result<AccountLockedResponse, LockupError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.gate.notified().await;
                return Ok(response(vec![lock("old", "0001-01-01T00:00:00Z", &[])]));
            }
            Ok(response(vec![lock("new", "0001-01-01T00:00:00Z", &[])]))
        }
    }

    #[tokio::test]
    async fn superseded_response_is_discarded() {
        let transport = Arc::new(GatedTransport {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let q = Arc::new(AccountLockQuery::new(
            "osmosis-1",
            "osmo1a",
            Arc::new(RecordingResolver::default()),
            transport.clone(),
            Arc::new(MemoryResponseCache::new()),
        ));

        let slow = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.fetch().await })
        };
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(q.fetch().await.unwrap());
        transport.gate.notify_one();
        assert!(!slow.await.unwrap().unwrap(), "older fetch must not apply");

        let snapshot = q.snapshot().unwrap();
        assert_eq!(snapshot.locks[0].id, "new");
        assert_eq!(snapshot.version, 1);
    }

    // ── Superseded fetch racing across threads ───────────────────────────────

    /// First call returns `old`, every later call returns `new`.
    struct OldThenNew {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LockupTransport for OldThenNew {
        async fn account_locked_longer_duration(
            &self,
            _chain_id: &str,
            _address: &str,
        ) -> Result<AccountLockedResponse, LockupError> {
            let id = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 { "old" } else { "new" };
            Ok(response(vec![lock(id, "0001-01-01T00:00:00Z", &[("uosmo", "1")])]))
        }
    }

    /// Parks the first registration until released, so the first fetch is
    /// held between its early staleness check and the snapshot swap.
    struct ParkingResolver {
        calls: AtomicUsize,
        entered: std::sync::mpsc::Sender<()>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl ChainResolver for ParkingResolver {
        fn add_unknown_currencies(&self, _chain_id: &str, _denoms: &[String]) {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.send(()).unwrap();
                self.release
                    .lock()
                    .recv_timeout(std::time::Duration::from_secs(10))
                    .unwrap();
            }
        }

        fn find_currency(&self, _chain_id: &str, _minimal_denom: &str) -> Option<Currency> {
            None
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn older_fetch_parked_after_check_does_not_overwrite_newer() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let q = Arc::new(AccountLockQuery::new(
            "osmosis-1",
            "osmo1a",
            Arc::new(ParkingResolver {
                calls: AtomicUsize::new(0),
                entered: entered_tx,
                release: Mutex::new(release_rx),
            }),
            Arc::new(OldThenNew { calls: AtomicUsize::new(0) }),
            Arc::new(MemoryResponseCache::new()),
        ));

        let older = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.fetch().await })
        };
        // The older fetch is now blocked on a worker thread inside
        // registration, past the pre-apply staleness check.
        entered_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();

        assert!(q.fetch().await.unwrap(), "newer fetch applies");
        assert_eq!(q.snapshot().unwrap().locks[0].id, "new");

        release_tx.send(()).unwrap();
        assert!(!older.await.unwrap().unwrap(), "older fetch must not apply");

        let snapshot = q.snapshot().unwrap();
        assert_eq!(snapshot.locks[0].id, "new");
        assert_eq!(snapshot.version, 1);
        assert_eq!(q.version(), 1);
    }

    #[tokio::test]
    async fn version_matches_snapshot_after_apply() {
        let transport = ScriptedTransport::with(vec![Ok(response(vec![])), Ok(response(vec![]))]);
        let (q, _, _) = build("osmo1a", transport);
        for expected in 1..=2 {
            q.fetch().await.unwrap();
            assert_eq!(q.version(), expected);
            assert_eq!(q.snapshot().unwrap().version, expected);
        }
    }
}
