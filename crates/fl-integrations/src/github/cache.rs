//! Conditional-fetch cache in front of the forge API.
//!
//! Every request for a given `method:url` key runs under that key's lock.
//! Entries carrying an `ETag` are always revalidated with `If-None-Match`
//! (a `304` hands back the stored body); entries without one are only kept
//! for repository listings and are served straight from memory until they
//! expire.
//!
//! Two named tiers with their own TTL policy hold the entries:
//! - **item**: issue/pull/user lookups, kept only when validated
//! - **index**: repository listings, also kept unvalidated for a short while

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue, IF_NONE_MATCH};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, warn};

use fl_core::config::CacheConfig;

use super::endpoints::EndpointKind;
use super::key_lock::KeyLocks;
use super::transport::{Body, HttpRequest, HttpTransport, TransportError};

// ---------------------------------------------------------------------------
// Entries and TTL policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub validator: Option<String>,
    pub body: Body,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    /// Lifetime of entries stored with a validator.
    pub validated: Duration,
    /// Lifetime of entries stored without one; `None` means never store them.
    pub unvalidated: Option<Duration>,
}

impl TtlPolicy {
    fn ttl_for(&self, validator: Option<&str>) -> Option<Duration> {
        match validator {
            Some(_) => Some(self.validated),
            None => self.unvalidated,
        }
    }
}

// ---------------------------------------------------------------------------
// Expiry sweeps
// ---------------------------------------------------------------------------

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when a map keyed by rarely revisited entries gets a full pass
/// that drops everything expired. Lookups only evict their own key.
#[derive(Debug)]
pub struct SweepSchedule {
    interval: Duration,
    next: Mutex<Instant>,
}

impl SweepSchedule {
    /// Sweep at most once per `ttl`, and at least once a minute.
    pub fn new(ttl: Duration) -> Self {
        let interval = ttl.min(MAX_SWEEP_INTERVAL);
        Self {
            interval,
            next: Mutex::new(Instant::now() + interval),
        }
    }

    /// True at most once per interval; the caller is expected to sweep.
    pub fn due(&self) -> bool {
        let now = Instant::now();
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if now < *next {
            return false;
        }
        *next = now + self.interval;
        true
    }
}

// ---------------------------------------------------------------------------
// ResponseCache (one tier)
// ---------------------------------------------------------------------------

/// One named cache tier.
#[derive(Debug)]
pub struct ResponseCache {
    name: &'static str,
    policy: TtlPolicy,
    entries: DashMap<String, CacheEntry>,
    sweeps: SweepSchedule,
}

impl ResponseCache {
    pub fn new(name: &'static str, policy: TtlPolicy) -> Self {
        let shortest = policy
            .unvalidated
            .map_or(policy.validated, |ttl| ttl.min(policy.validated));
        Self {
            name,
            policy,
            entries: DashMap::new(),
            sweeps: SweepSchedule::new(shortest),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    /// Fresh entry for `key`; expired entries are evicted on sight.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.get(key).map(|e| e.clone())?;
        if entry.is_fresh() {
            Some(entry)
        } else {
            self.entries.remove(key);
            None
        }
    }

    /// Store a response according to this tier's policy. Returns whether the
    /// entry was kept.
    fn store(&self, key: &str, validator: Option<String>, body: Body) -> bool {
        let Some(ttl) = self.policy.ttl_for(validator.as_deref()) else {
            return false;
        };
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                validator,
                body,
                expires_at: Instant::now() + ttl,
            },
        );
        self.sweep_expired();
        true
    }

    fn sweep_expired(&self) {
        if !self.sweeps.due() {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh());
        let swept = before.saturating_sub(self.entries.len());
        if swept > 0 {
            debug!(tier = self.name, swept, "expired entries swept");
        }
    }

    /// Push back the expiry of a revalidated entry.
    fn refresh(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if let Some(ttl) = self.policy.ttl_for(entry.validator.as_deref()) {
                entry.expires_at = Instant::now() + ttl;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    revalidated: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

/// Point-in-time view of cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from memory with no request.
    pub hits: u64,
    /// Conditional request answered with `304`.
    pub revalidated: u64,
    /// Full response fetched from upstream.
    pub misses: u64,
    /// Responses written to a tier.
    pub stores: u64,
}

// ---------------------------------------------------------------------------
// Fetched
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Revalidated,
    Network,
}

/// What a cached fetch produced. A revalidated body is reported as `200`.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Body,
    pub source: FetchSource,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// ConditionalFetchCache
// ---------------------------------------------------------------------------

pub struct ConditionalFetchCache {
    transport: Arc<dyn HttpTransport>,
    items: ResponseCache,
    index: ResponseCache,
    locks: KeyLocks,
    counters: CacheCounters,
}

impl ConditionalFetchCache {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &CacheConfig) -> Self {
        Self {
            transport,
            items: ResponseCache::new(
                "item",
                TtlPolicy {
                    validated: config.item_ttl(),
                    unvalidated: None,
                },
            ),
            index: ResponseCache::new(
                "index",
                TtlPolicy {
                    validated: config.item_ttl(),
                    unvalidated: Some(config.index_ttl()),
                },
            ),
            locks: KeyLocks::new(),
            counters: CacheCounters::default(),
        }
    }

    /// The tier a URL is stored in.
    pub fn tier_for(&self, url: &str) -> &ResponseCache {
        match EndpointKind::of(url) {
            EndpointKind::RepositoryListing => &self.index,
            EndpointKind::Item => &self.items,
        }
    }

    pub fn items(&self) -> &ResponseCache {
        &self.items
    }

    pub fn index(&self) -> &ResponseCache {
        &self.index
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            revalidated: self.counters.revalidated.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
        }
    }

    /// Number of keys with a request currently in flight or queued.
    pub fn active_keys(&self) -> usize {
        self.locks.active_keys()
    }

    /// Fetch `url`, revalidating any cached copy.
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        mut headers: HeaderMap,
    ) -> Result<Fetched, TransportError> {
        let key = format!("{}:{}", method, url);
        let tier = self.tier_for(url);
        let _guard = self.locks.acquire(&key).await;

        let cached = tier.get(&key);
        if let Some(entry) = &cached {
            match &entry.validator {
                None => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(tier = tier.name(), %key, "served from cache without revalidation");
                    return Ok(Fetched {
                        status: 200,
                        body: entry.body.clone(),
                        source: FetchSource::Cache,
                    });
                }
                Some(etag) => match HeaderValue::from_str(etag) {
                    Ok(value) => {
                        headers.insert(IF_NONE_MATCH, value);
                    }
                    Err(_) => warn!(%key, "stored validator is not a valid header value"),
                },
            }
        }

        let response = self
            .transport
            .request(HttpRequest {
                method,
                url: url.to_string(),
                headers,
                body: None,
            })
            .await?;

        if response.status == 304 {
            if let Some(entry) = cached {
                self.counters.revalidated.fetch_add(1, Ordering::Relaxed);
                tier.refresh(&key);
                debug!(tier = tier.name(), %key, "not modified, reusing cached body");
                return Ok(Fetched {
                    status: 200,
                    body: entry.body,
                    source: FetchSource::Revalidated,
                });
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        if response.is_success() {
            let validator = response.etag();
            let has_validator = validator.is_some();
            if tier.store(&key, validator, response.body.clone()) {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
                debug!(tier = tier.name(), %key, has_validator, "response cached");
            }
        } else {
            debug!(%key, status = response.status, "upstream returned non-success status");
        }

        Ok(Fetched {
            status: response.status,
            body: response.body,
            source: FetchSource::Network,
        })
    }
}

impl std::fmt::Debug for ConditionalFetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalFetchCache")
            .field("items", &self.items.len())
            .field("index", &self.index.len())
            .field("stats", &self.stats())
            .finish()
    }
}
