//! Nullifier registry for replay protection.
//!
//! Nullifiers are grouped by scope. Under [`ScopePolicy::Global`] every
//! nullifier lives in one set forever. Under [`ScopePolicy::PerCycle`] each
//! billing cycle has its own set so a closed cycle can be dropped, but a
//! nullifier is still rejected while any open scope holds it. The proof does
//! not reveal its cycle, so a scope may only be cleared once that cycle's
//! payment root is no longer accepted.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use shieldlist_circuits::to_decimal;

use crate::config::Config;

/// Which set a nullifier belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NullifierScope {
    Global,
    Cycle(u64),
}

impl fmt::Display for NullifierScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullifierScope::Global => f.write_str("global"),
            NullifierScope::Cycle(cycle) => write!(f, "cycle {}", cycle),
        }
    }
}

/// How payment cycles map to scopes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    #[default]
    Global,
    PerCycle,
}

impl ScopePolicy {
    pub fn scope_for(&self, pay_cycle: u64) -> NullifierScope {
        match self {
            ScopePolicy::PerCycle => NullifierScope::Cycle(pay_cycle),
            ScopePolicy::Global => NullifierScope::Global,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Nullifier {nullifier} already used in {scope}")]
    DuplicateNullifier {
        nullifier: String,
        scope: NullifierScope,
    },
}

/// Set of spent nullifiers; check-and-insert is atomic.
#[derive(Debug, Default)]
pub struct NullifierRegistry {
    policy: ScopePolicy,
    scopes: Mutex<HashMap<NullifierScope, HashSet<Fr>>>,
}

impl NullifierRegistry {
    pub fn new(policy: ScopePolicy) -> Self {
        Self {
            policy,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.registry.scope)
    }

    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    pub fn scope_for(&self, pay_cycle: u64) -> NullifierScope {
        self.policy.scope_for(pay_cycle)
    }

    // Every critical section is a single set operation; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<NullifierScope, HashSet<Fr>>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, scope: NullifierScope, nullifier: &Fr) -> bool {
        self.lock()
            .get(&scope)
            .map_or(false, |set| set.contains(nullifier))
    }

    /// Record a nullifier in `scope`, failing if any open scope already holds it.
    pub fn insert(&self, scope: NullifierScope, nullifier: Fr) -> Result<(), RegistryError> {
        let mut scopes = self.lock();
        let spent_in = scopes
            .iter()
            .find(|(_, set)| set.contains(&nullifier))
            .map(|(spent_in, _)| *spent_in);
        if let Some(spent_in) = spent_in {
            let nullifier = to_decimal(&nullifier);
            warn!(scope = %spent_in, %nullifier, "Duplicate nullifier rejected");
            return Err(RegistryError::DuplicateNullifier {
                nullifier,
                scope: spent_in,
            });
        }
        scopes.entry(scope).or_default().insert(nullifier);
        debug!(%scope, "Nullifier recorded");
        Ok(())
    }

    /// Total nullifiers across all scopes.
    pub fn len(&self) -> usize {
        self.lock().values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a whole scope (epoch rollover). Returns how many were removed.
    pub fn clear_scope(&self, scope: NullifierScope) -> usize {
        let removed = self.lock().remove(&scope).map_or(0, |set| set.len());
        debug!(%scope, removed, "Nullifier scope cleared");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_then_duplicate() {
        let registry = NullifierRegistry::new(ScopePolicy::PerCycle);
        let scope = registry.scope_for(30);
        let n = Fr::from(1234u64);

        assert!(!registry.contains(scope, &n));
        registry.insert(scope, n).unwrap();
        assert!(registry.contains(scope, &n));

        let err = registry.insert(scope, n).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateNullifier { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_policy_is_global() {
        assert_eq!(ScopePolicy::default(), ScopePolicy::Global);
        assert_eq!(NullifierRegistry::default().policy(), ScopePolicy::Global);
        assert_eq!(
            NullifierRegistry::from_config(&Config::default()).policy(),
            ScopePolicy::Global
        );
    }

    #[test]
    fn test_from_config_reads_scope() {
        let mut config = Config::default();
        config.registry.scope = ScopePolicy::PerCycle;
        let registry = NullifierRegistry::from_config(&config);
        assert_eq!(registry.scope_for(7), NullifierScope::Cycle(7));
    }

    #[test]
    fn test_per_cycle_rejects_nullifier_from_other_open_cycle() {
        let registry = NullifierRegistry::new(ScopePolicy::PerCycle);
        let n = Fr::from(9u64);

        registry.insert(registry.scope_for(1), n).unwrap();
        let err = registry.insert(registry.scope_for(2), n).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateNullifier {
                nullifier: "9".to_string(),
                scope: NullifierScope::Cycle(1),
            }
        );
        assert!(!registry.contains(NullifierScope::Cycle(2), &n));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_per_cycle_clear_scope() {
        let registry = NullifierRegistry::new(ScopePolicy::PerCycle);
        let a = Fr::from(9u64);
        let b = Fr::from(10u64);

        registry.insert(registry.scope_for(1), a).unwrap();
        registry.insert(registry.scope_for(2), b).unwrap();
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.clear_scope(NullifierScope::Cycle(1)), 1);
        assert!(!registry.contains(NullifierScope::Cycle(1), &a));
        assert!(registry.contains(NullifierScope::Cycle(2), &b));
    }

    #[test]
    fn test_global_policy_spans_cycles() {
        let registry = NullifierRegistry::new(ScopePolicy::Global);
        let n = Fr::from(9u64);

        registry.insert(registry.scope_for(1), n).unwrap();
        assert!(registry.insert(registry.scope_for(2), n).is_err());
        assert_eq!(registry.clear_scope(NullifierScope::Global), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_insert_admits_one() {
        let registry = Arc::new(NullifierRegistry::new(ScopePolicy::Global));
        let n = Fr::from(42u64);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.insert(NullifierScope::Global, n).is_ok())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
