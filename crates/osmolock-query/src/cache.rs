use std::collections::HashMap;

use parking_lot::RwLock;

use osmolock_core::types::AccountLockedResponse;

/// Storage for the last accepted response per query key.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<AccountLockedResponse>;
    fn put(&self, key: &str, response: AccountLockedResponse);
}

/// Process-local [`ResponseCache`].
#[derive(Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<String, AccountLockedResponse>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ResponseCache for MemoryResponseCache {
    fn get(&self, key: &str) -> Option<AccountLockedResponse> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: &str, response: AccountLockedResponse) {
        self.entries.write().insert(key.to_string(), response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmolock_core::types::{Coin, Lock};

    #[test]
    fn put_replaces_previous_entry() {
        let cache = MemoryResponseCache::new();
        assert!(cache.get("osmosis-1/a").is_none());

        cache.put("osmosis-1/a", AccountLockedResponse::default());
        let second = AccountLockedResponse {
            locks: vec![Lock {
                id: "1".into(),
                duration: "60s".into(),
                end_time: "0001-01-01T00:00:00Z".into(),
                coins: vec![Coin::new("uosmo", "1")],
            }],
        };
        cache.put("osmosis-1/a", second.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("osmosis-1/a"), Some(second));
    }
}
