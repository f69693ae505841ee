use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::ResponseCache;
use crate::chain::ChainResolver;
use crate::query::AccountLockQuery;
use crate::transport::LockupTransport;

/// One [`AccountLockQuery`] per address on a single chain.
///
/// Entries are created on first lookup and kept for the registry's lifetime.
pub struct AccountLockRegistry {
    chain_id: String,
    resolver: Arc<dyn ChainResolver>,
    transport: Arc<dyn LockupTransport>,
    cache: Arc<dyn ResponseCache>,
    queries: RwLock<HashMap<String, Arc<AccountLockQuery>>>,
}

impl AccountLockRegistry {
    pub fn new(
        chain_id: impl Into<String>,
        resolver: Arc<dyn ChainResolver>,
        transport: Arc<dyn LockupTransport>,
        cache: Arc<dyn ResponseCache>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            resolver,
            transport,
            cache,
            queries: RwLock::new(HashMap::new()),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// The query for `address`, created on first request.
    pub fn get(&self, address: &str) -> Arc<AccountLockQuery> {
        if let Some(q) = self.queries.read().get(address) {
            return Arc::clone(q);
        }

        let mut queries = self.queries.write();
        let q = queries.entry(address.to_string()).or_insert_with(|| {
            debug!(chain_id = %self.chain_id, address, "creating account lock query");
            Arc::new(AccountLockQuery::new(
                self.chain_id.clone(),
                address,
                Arc::clone(&self.resolver),
                Arc::clone(&self.transport),
                Arc::clone(&self.cache),
            ))
        });
        Arc::clone(q)
    }

    pub fn len(&self) -> usize {
        self.queries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.read().is_empty()
    }

    /// Addresses with a live query, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut out: Vec<String> = self.queries.read().keys().cloned().collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryResponseCache;
    use crate::chain::ChainRegistry;
    use async_trait::async_trait;
    use osmolock_core::error::LockupError;
    use osmolock_core::types::AccountLockedResponse;

    struct NeverCalled;

    #[async_trait]
    impl LockupTransport for NeverCalled {
        async fn account_locked_longer_duration(
            &self,
            _chain_id: &str,
            _address: &str,
        ) -> Result<AccountLockedResponse, LockupError> {
            Err(LockupError::Other("transport not expected in this test".into()))
        }
    }

    fn registry() -> AccountLockRegistry {
        AccountLockRegistry::new(
            "osmosis-1",
            Arc::new(ChainRegistry::new()),
            Arc::new(NeverCalled),
            Arc::new(MemoryResponseCache::new()),
        )
    }

    #[test]
    fn same_address_returns_same_instance() {
        let reg = registry();
        let a = reg.get("osmo1a");
        let b = reg.get("osmo1a");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn distinct_addresses_get_distinct_queries() {
        let reg = registry();
        let a = reg.get("osmo1a");
        let b = reg.get("osmo1b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.address(), "osmo1b");
        assert_eq!(b.chain_id(), "osmosis-1");
        assert_eq!(reg.addresses(), vec!["osmo1a", "osmo1b"]);
    }

    #[test]
    fn empty_address_gets_a_disabled_query() {
        let reg = registry();
        let q = reg.get("");
        assert!(!q.is_fetchable());
        assert!(Arc::ptr_eq(&q, &reg.get("")));
    }

    #[test]
    fn entries_are_retained() {
        let reg = registry();
        assert!(reg.is_empty());
        for i in 0..100 {
            reg.get(&format!("osmo1{i}"));
        }
        assert_eq!(reg.len(), 100);
    }
}
