//! Bounded per-signature verification cache.

use std::collections::{HashMap, VecDeque};

/// Default number of signatures remembered.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// On-chain outcome of an earlier confirmation. Payment terms depend on
/// the route and are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Confirmed,
    Failed,
}

/// Remembers confirmation verdicts by signature.
///
/// When full, the oldest fifth of the entries is evicted in insertion order.
#[derive(Debug)]
pub struct VerificationCache {
    capacity: usize,
    verdicts: HashMap<String, Verdict>,
    order: VecDeque<String>,
}

impl Default for VerificationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl VerificationCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            verdicts: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, signature: &str) -> Option<Verdict> {
        self.verdicts.get(signature).copied()
    }

    pub fn insert(&mut self, signature: &str, verdict: Verdict) {
        if let Some(existing) = self.verdicts.get_mut(signature) {
            *existing = verdict;
            return;
        }
        if self.verdicts.len() >= self.capacity {
            let evict = (self.capacity / 5).max(1);
            for _ in 0..evict {
                match self.order.pop_front() {
                    Some(old) => {
                        self.verdicts.remove(&old);
                    }
                    None => break,
                }
            }
        }
        self.verdicts.insert(signature.to_string(), verdict);
        self.order.push_back(signature.to_string());
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}
