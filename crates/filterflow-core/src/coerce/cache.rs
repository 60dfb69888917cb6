//! Memoization for value conversions; private to the coercion boundary.

use crate::value::Value;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

// Entries are immutable once written and never invalidated. Only scalar
// conversions are memoized; list and map conversions recurse uncached.
static CONVERSIONS: OnceLock<Mutex<BTreeMap<(String, String), Value>>> = OnceLock::new();
static COMPARABLES: OnceLock<Mutex<BTreeMap<String, Value>>> = OnceLock::new();
static HITS: AtomicUsize = AtomicUsize::new(0);
static MISSES: AtomicUsize = AtomicUsize::new(0);

const CACHE_DISABLED: bool = cfg!(test);

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub conversions: usize,
    pub comparables: usize,
}

pub(super) fn get_conversion(value_key: &str, target_key: &str) -> Option<Value> {
    if CACHE_DISABLED {
        return None;
    }
    let found = conversions()
        .lock()
        .ok()?
        .get(&(value_key.to_string(), target_key.to_string()))
        .cloned();
    record(found.is_some());
    found
}

pub(super) fn insert_conversion(value_key: String, target_key: String, converted: Value) {
    if CACHE_DISABLED {
        return;
    }
    if let Ok(mut cache) = conversions().lock() {
        cache.insert((value_key, target_key), converted);
    }
}

pub(super) fn get_comparable(value_key: &str) -> Option<Value> {
    if CACHE_DISABLED {
        return None;
    }
    let found = comparables().lock().ok()?.get(value_key).cloned();
    record(found.is_some());
    found
}

pub(super) fn insert_comparable(value_key: String, comparable: Value) {
    if CACHE_DISABLED {
        return;
    }
    if let Ok(mut cache) = comparables().lock() {
        cache.insert(value_key, comparable);
    }
}

// Stats are best-effort; relaxed ordering is sufficient.
fn record(hit: bool) {
    if hit {
        HITS.fetch_add(1, Ordering::Relaxed);
    } else {
        MISSES.fetch_add(1, Ordering::Relaxed);
    }
}

#[must_use]
pub fn stats() -> CacheStats {
    let conversions = CONVERSIONS
        .get()
        .and_then(|c| c.lock().ok())
        .map_or(0, |c| c.len());
    let comparables = COMPARABLES
        .get()
        .and_then(|c| c.lock().ok())
        .map_or(0, |c| c.len());

    CacheStats {
        hits: HITS.load(Ordering::Relaxed),
        misses: MISSES.load(Ordering::Relaxed),
        conversions,
        comparables,
    }
}

fn conversions() -> &'static Mutex<BTreeMap<(String, String), Value>> {
    CONVERSIONS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn comparables() -> &'static Mutex<BTreeMap<String, Value>> {
    COMPARABLES.get_or_init(|| Mutex::new(BTreeMap::new()))
}
