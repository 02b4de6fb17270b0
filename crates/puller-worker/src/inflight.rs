//! Registry of object keys currently being transferred.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Keys with a transfer in progress.
///
/// A key can be claimed once; the claim is released when its guard drops.
#[derive(Debug, Clone, Default)]
pub struct InFlightKeys {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightKeys {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`, or returns `None` if another transfer already holds it.
    pub fn try_claim(&self, key: &str) -> Option<InFlightGuard> {
        if !self.lock().insert(key.to_owned()) {
            return None;
        }

        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key: key.to_owned(),
        })
    }

    /// Returns true if `key` is currently claimed.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    /// Returns the number of claimed keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no key is claimed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases a claimed key on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    /// Returns the claimed key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_released() {
        let keys = InFlightKeys::new();

        let guard = keys.try_claim("a.csv").unwrap();
        assert_eq!(guard.key(), "a.csv");
        assert!(keys.contains("a.csv"));
        assert!(keys.try_claim("a.csv").is_none());
        assert!(keys.try_claim("b.csv").is_some());

        drop(guard);
        assert!(!keys.contains("a.csv"));
        assert!(keys.try_claim("a.csv").is_some());
    }

    #[test]
    fn test_clones_share_claims() {
        let keys = InFlightKeys::new();
        let other = keys.clone();

        let _guard = keys.try_claim("a.csv").unwrap();
        assert!(other.try_claim("a.csv").is_none());
        assert_eq!(other.len(), 1);
    }
}
