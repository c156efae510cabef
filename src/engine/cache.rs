// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The call-scoped memoization cache.
//!
//! One cache lives for exactly one top-level evaluation call; abandoning
//! the call drops the cache, there is no cross-call persistence. Keys are
//! `(structural token, canonical request)` pairs, so independently
//! constructed but structurally equal blocks share entries.
//!
//! Each entry is a single-flight cell: when concurrent fan-out reaches the
//! same unpopulated key, exactly one task computes the value and the others
//! wait for and reuse it.

use crate::protocol::Value;
use crate::traits::BlockToken;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Key identifying one memoizable computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub token: BlockToken,
    pub request: String,
}

impl CacheKey {
    pub fn new(token: BlockToken, request: String) -> Self {
        Self { token, request }
    }
}

pub(crate) type CacheSlot = Arc<OnceCell<Arc<Value>>>;

/// Insert-if-absent map of single-flight result cells.
#[derive(Default)]
pub(crate) struct CallCache {
    slots: Mutex<HashMap<CacheKey, CacheSlot>>,
}

impl CallCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `key`, creating an empty one when absent. The lock only
    /// guards the map; computation happens outside it, inside the slot.
    pub async fn slot(&self, key: CacheKey) -> CacheSlot {
        let mut slots = self.slots.lock().await;
        slots.entry(key).or_default().clone()
    }

    /// Number of keys touched so far in this call.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(token: &str, request: &str) -> CacheKey {
        CacheKey::new(
            BlockToken::compose(token, Vec::<String>::new()),
            request.to_string(),
        )
    }

    #[tokio::test]
    async fn equal_keys_share_a_slot() {
        let cache = CallCache::new();
        let a = cache.slot(key("source", "r1")).await;
        let b = cache.slot(key("source", "r1")).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn different_requests_get_distinct_slots() {
        let cache = CallCache::new();
        let a = cache.slot(key("source", "r1")).await;
        let b = cache.slot(key("source", "r2")).await;
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn single_flight_initialization() {
        let cache = Arc::new(CallCache::new());
        let slot = cache.slot(key("source", "r1")).await;

        let computed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let slot = slot.clone();
            let computed = computed.clone();
            handles.push(tokio::spawn(async move {
                slot.get_or_try_init(|| async {
                    computed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    Ok::<_, std::convert::Infallible>(Arc::new(Value::Number(42.0)))
                })
                .await
                .map(|v| (**v).clone())
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Value::Number(42.0));
        }
        assert_eq!(computed.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
