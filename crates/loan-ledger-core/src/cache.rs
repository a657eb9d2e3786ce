//! Memo for per-loan figures.
//!
//! Entries are keyed by loan id and the loan's `updatedAt`, so any edit to the
//! loan produces a fresh key. Entries older than the TTL are ignored and can
//! be dropped with [`CalculationCache::purge_expired`]. Figures that depend
//! on a reference date are only valid for that date: keep one cache per
//! reference date and week mode.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

use crate::config::LedgerConfig;
use crate::loan::Loan;
use crate::timestamp::Timestamp;

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub loan_id: String,
    pub updated_at: Option<Timestamp>,
}

impl CacheKey {
    /// `None` for loans without an id; those are never cached.
    pub fn for_loan(loan: &Loan) -> Option<Self> {
        loan.id.as_ref().map(|id| Self {
            loan_id: id.clone(),
            updated_at: loan.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CalculationCache<V, C: Clock = SystemClock> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    ttl: TimeDelta,
    clock: C,
}

impl<V: Clone> CalculationCache<V, SystemClock> {
    pub fn new(ttl: TimeDelta) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.cache_ttl())
    }
}

impl<V: Clone, C: Clock> CalculationCache<V, C> {
    pub fn with_clock(ttl: TimeDelta, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key, CacheEntry { value, stored_at });
    }

    /// Cached figures for `loan`, computing and storing them on a miss.
    pub fn get_or_compute<F>(&mut self, loan: &Loan, compute: F) -> V
    where
        F: FnOnce(&Loan) -> V,
    {
        let Some(key) = CacheKey::for_loan(loan) else {
            return compute(loan);
        };
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute(loan);
        self.insert(key, value.clone());
        value
    }

    /// Drop every entry for `loan_id`, whatever its `updatedAt`.
    pub fn invalidate(&mut self, loan_id: &str) {
        self.entries.retain(|key, _| key.loan_id != loan_id);
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
