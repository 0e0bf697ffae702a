//! `Accept-Encoding` negotiation
//!
//! Orders the encodings a client accepts by quality, breaking ties by the
//! server's preference order and then by header position. Results are
//! cached per raw header value in a bounded `DashMap`; once full the cache
//! is cleared wholesale rather than evicting single entries, which keeps
//! it bounded under hostile input.

use crate::http::quoted;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default number of distinct `Accept-Encoding` values remembered
pub const DEFAULT_CACHE_SIZE: usize = 100;

#[derive(Debug)]
pub struct EncodingNegotiator {
    preferred: Vec<String>,
    cache: DashMap<String, Arc<[String]>>,
    capacity: AtomicUsize,
}

impl EncodingNegotiator {
    /// `preferred` ranks equal-quality tokens; unlisted tokens come last
    pub fn new(preferred: Vec<String>, capacity: usize) -> Self {
        Self {
            preferred: preferred
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            cache: DashMap::new(),
            capacity: AtomicUsize::new(capacity),
        }
    }

    /// Encoding tokens acceptable to the client, most preferred first
    ///
    /// Multiple header lines are joined with `,`. Tokens with `q=0` or an
    /// invalid quality are left out.
    pub fn preferred_order<'a>(&self, header_values: impl IntoIterator<Item = &'a str>) -> Arc<[String]> {
        let key = header_values.into_iter().collect::<Vec<_>>().join(",");
        if key.trim().is_empty() {
            return Arc::from(Vec::new());
        }

        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit.value());
        }

        let order: Arc<[String]> = Arc::from(self.parse(&key));
        let capacity = self.capacity();
        if capacity > 0 {
            if self.cache.len() >= capacity {
                self.cache.clear();
            }
            self.cache.insert(key, Arc::clone(&order));
        }
        order
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Change the cache bound, clearing the cache if it no longer fits
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
        if capacity < self.cache.len() {
            self.cache.clear();
        }
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn rank(&self, token: &str) -> usize {
        self.preferred
            .iter()
            .position(|p| p == token)
            .unwrap_or(self.preferred.len())
    }

    fn parse(&self, value: &str) -> Vec<String> {
        let mut items = quoted::parse_quality_csv(value);
        items.retain(|item| item.quality > 0);
        // Stable sort keeps header order among equal keys
        items.sort_by_key(|item| (Reverse(item.quality), self.rank(&item.token)));
        items.into_iter().map(|item| item.token).collect()
    }
}

impl Default for EncodingNegotiator {
    fn default() -> Self {
        Self::new(vec!["br".to_string(), "gzip".to_string()], DEFAULT_CACHE_SIZE)
    }
}
