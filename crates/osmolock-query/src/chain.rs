use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use osmolock_core::currency::Currency;

/// Chain currency metadata as the query layer needs it.
pub trait ChainResolver: Send + Sync {
    /// Register denominations seen in lock data. Must be idempotent per denom.
    fn add_unknown_currencies(&self, chain_id: &str, denoms: &[String]);

    /// Look up a currency by its minimal denomination.
    fn find_currency(&self, chain_id: &str, minimal_denom: &str) -> Option<Currency>;
}

/// In-memory [`ChainResolver`] keyed by chain id.
///
/// Unknown denominations are registered as [`Currency::unknown`] placeholders
/// so they can be displayed until real metadata is supplied through
/// [`ChainRegistry::add_currency`].
#[derive(Default)]
pub struct ChainRegistry {
    chains: RwLock<HashMap<String, Vec<Currency>>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) known metadata for a currency.
    pub fn add_currency(&self, chain_id: &str, currency: Currency) {
        let mut chains = self.chains.write();
        let currencies = chains.entry(chain_id.to_string()).or_default();
        match currencies
            .iter_mut()
            .find(|c| c.coin_minimal_denom == currency.coin_minimal_denom)
        {
            Some(existing) => *existing = currency,
            None => currencies.push(currency),
        }
    }

    pub fn currencies(&self, chain_id: &str) -> Vec<Currency> {
        self.chains.read().get(chain_id).cloned().unwrap_or_default()
    }
}

impl ChainResolver for ChainRegistry {
    fn add_unknown_currencies(&self, chain_id: &str, denoms: &[String]) {
        let mut chains = self.chains.write();
        let currencies = chains.entry(chain_id.to_string()).or_default();
        for denom in denoms {
            if currencies.iter().any(|c| &c.coin_minimal_denom == denom) {
                continue;
            }
            debug!(chain_id, denom = %denom, "registering unknown currency");
            currencies.push(Currency::unknown(denom.clone()));
        }
    }

    fn find_currency(&self, chain_id: &str, minimal_denom: &str) -> Option<Currency> {
        self.chains
            .read()
            .get(chain_id)?
            .iter()
            .find(|c| c.coin_minimal_denom == minimal_denom)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_registration_is_idempotent() {
        let reg = ChainRegistry::new();
        let denoms = vec!["gamm/pool/1".to_string(), "uion".to_string()];
        reg.add_unknown_currencies("osmosis-1", &denoms);
        reg.add_unknown_currencies("osmosis-1", &denoms);
        assert_eq!(reg.currencies("osmosis-1").len(), 2);
    }

    #[test]
    fn known_currency_is_not_replaced_by_placeholder() {
        let reg = ChainRegistry::new();
        reg.add_currency("osmosis-1", Currency::new("OSMO", "uosmo", 6));
        reg.add_unknown_currencies("osmosis-1", &["uosmo".to_string()]);

        let found = reg.find_currency("osmosis-1", "uosmo").unwrap();
        assert_eq!(found.coin_decimals, 6);
        assert_eq!(reg.currencies("osmosis-1").len(), 1);
    }

    #[test]
    fn chains_are_isolated() {
        let reg = ChainRegistry::new();
        reg.add_unknown_currencies("osmosis-1", &["uosmo".to_string()]);
        assert!(reg.find_currency("osmo-test-5", "uosmo").is_none());
        assert_eq!(
            reg.find_currency("osmosis-1", "uosmo"),
            Some(Currency::unknown("uosmo"))
        );
    }
}
