//! Trust anchor resolution with a shared, rotation-aware cache.
//!
//! The cache is the engine's only shared mutable state. Lookups take a read
//! lock; inserts, evictions and rotation notices take the write lock. An
//! anchor is never edited in place: a refresh swaps in a whole new
//! `Arc<TrustAnchor>`, so a reader holds either the old key set or the new
//! one.
//!
//! Lifecycle of an entry:
//! 1. Populated on the first `resolve` for an issuer (bounded-time fetch)
//! 2. Invalidated by `notify_rotation` with a newer epoch
//! 3. Evicted once unused for longer than the retention window, or as the
//!    least recently used entry when the cache is full
//!
//! At most one key-source fetch per issuer is in flight. Concurrent misses
//! wait on that fetch, and after it times out the issuer is treated as
//! unreachable for `unreachable_backoff_secs`, so a hung source holds one
//! worker thread per issuer rather than one per attempt.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::{AuthError, Result};

use super::keyset::KeySet;
use super::source::KeySource;
use super::TrustAnchor;

struct CachedAnchor {
    anchor: Arc<TrustAnchor>,
    last_used: AtomicU64,
}

#[derive(Default)]
struct CacheState {
    anchors: HashMap<String, CachedAnchor>,
    /// Epochs announced by rotation notices that no cached anchor has
    /// reached yet; fetches older than this are used once but not cached.
    rotation_floor: HashMap<String, u64>,
    /// Issuers whose last fetch timed out, with the time the backoff ends.
    unreachable: HashMap<String, u64>,
}

/// Result slot of one running key-source fetch.
#[derive(Default)]
struct PendingFetch {
    result: Mutex<Option<Result<KeySet>>>,
    done: Condvar,
}

type InFlight = Arc<Mutex<HashMap<String, Arc<PendingFetch>>>>;

/// Maps issuer identifiers to their current trust anchor.
pub struct TrustAnchorResolver {
    source: Arc<dyn KeySource>,
    state: RwLock<CacheState>,
    inflight: InFlight,
    retention_secs: u64,
    max_anchors: usize,
    fetch_timeout: Duration,
    backoff_secs: u64,
}

impl TrustAnchorResolver {
    pub fn new(source: Arc<dyn KeySource>, config: &EngineConfig) -> Self {
        Self {
            source,
            state: RwLock::new(CacheState::default()),
            retention_secs: config.anchor_retention_secs,
            max_anchors: config.max_anchors,
            fetch_timeout: config.fetch_timeout(),
            backoff_secs: config.unreachable_backoff_secs,
            inflight: Arc::default(),
        }
    }

    /// Resolve an issuer at the current wall-clock time.
    pub fn resolve(&self, issuer: &str) -> Result<Arc<TrustAnchor>> {
        self.resolve_at(issuer, crate::time::now_secs())
    }

    /// Resolve an issuer, treating `now` (Unix seconds) as the current time
    /// for retention bookkeeping.
    pub fn resolve_at(&self, issuer: &str, now: u64) -> Result<Arc<TrustAnchor>> {
        if let Some(anchor) = self.cached(issuer, now)? {
            return Ok(anchor);
        }

        self.check_reachable(issuer, now)?;
        log::debug!("trust anchor cache miss for issuer {issuer}");
        let set = self.fetch_bounded(issuer, now)?;
        let anchor = Arc::new(TrustAnchor::from_key_set(issuer, set, now));
        self.insert(Arc::clone(&anchor), now)?;
        Ok(anchor)
    }

    /// Handle a key-rotation notice from the key source.
    ///
    /// Drops the cached anchor if it predates `epoch`. Returns whether an
    /// entry was invalidated.
    pub fn notify_rotation(&self, issuer: &str, epoch: u64) -> bool {
        let Ok(mut state) = self.state.write() else {
            return false;
        };
        let stale = state
            .anchors
            .get(issuer)
            .map_or(false, |c| c.anchor.rotation_epoch < epoch);
        state.unreachable.remove(issuer);
        let floor = state.rotation_floor.entry(issuer.to_string()).or_insert(0);
        *floor = (*floor).max(epoch);
        if stale {
            state.anchors.remove(issuer);
            log::info!("trust anchor for {issuer} invalidated by rotation to epoch {epoch}");
        } else if state
            .anchors
            .get(issuer)
            .is_some_and(|c| c.anchor.rotation_epoch >= epoch)
        {
            state.rotation_floor.remove(issuer);
        }
        stale
    }

    /// Drop an issuer's cached anchor unconditionally.
    pub fn invalidate(&self, issuer: &str) -> bool {
        self.state
            .write()
            .map(|mut s| {
                s.unreachable.remove(issuer);
                s.anchors.remove(issuer).is_some()
            })
            .unwrap_or(false)
    }

    /// Evict anchors unused since before `now - retention`. Returns how many were evicted.
    pub fn evict_stale(&self, now: u64) -> usize {
        match self.state.write() {
            Ok(mut state) => self.evict_stale_locked(&mut state, now),
            Err(_) => 0,
        }
    }

    /// Number of cached anchors.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.anchors.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of key-source fetches currently running.
    pub fn fetches_in_flight(&self) -> usize {
        self.inflight.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn check_reachable(&self, issuer: &str, now: u64) -> Result<()> {
        let state = self
            .state
            .read()
            .map_err(|_| AuthError::UnknownIssuer(format!("{issuer} (anchor cache poisoned)")))?;
        match state.unreachable.get(issuer) {
            Some(&until) if now < until => {
                log::debug!("issuer {issuer} unreachable until {until}, not fetching");
                Err(AuthError::UnknownIssuer(format!("{issuer} (key source unreachable)")))
            }
            _ => Ok(()),
        }
    }

    fn mark_unreachable(&self, issuer: &str, now: u64) {
        if self.backoff_secs == 0 {
            return;
        }
        if let Ok(mut state) = self.state.write() {
            state
                .unreachable
                .insert(issuer.to_string(), now.saturating_add(self.backoff_secs));
        }
    }

    fn cached(&self, issuer: &str, now: u64) -> Result<Option<Arc<TrustAnchor>>> {
        let state = self
            .state
            .read()
            .map_err(|_| AuthError::UnknownIssuer(format!("{issuer} (anchor cache poisoned)")))?;
        let Some(entry) = state.anchors.get(issuer) else {
            return Ok(None);
        };
        if self.is_expired(entry.last_used.load(Ordering::Relaxed), now) {
            return Ok(None);
        }
        entry.last_used.fetch_max(now, Ordering::Relaxed);
        Ok(Some(Arc::clone(&entry.anchor)))
    }

    fn insert(&self, anchor: Arc<TrustAnchor>, now: u64) -> Result<()> {
        let mut state = self.state.write().map_err(|_| {
            AuthError::UnknownIssuer(format!("{} (anchor cache poisoned)", anchor.issuer))
        })?;

        let issuer = anchor.issuer.clone();
        state.unreachable.remove(&issuer);
        if let Some(&floor) = state.rotation_floor.get(&issuer) {
            if anchor.rotation_epoch < floor {
                log::warn!(
                    "key source returned epoch {} for {issuer}, rotation notice says {floor}; not caching",
                    anchor.rotation_epoch
                );
                return Ok(());
            }
            state.rotation_floor.remove(&issuer);
        }
        if let Some(existing) = state.anchors.get(&issuer) {
            // A concurrent miss may already have cached a newer epoch.
            if existing.anchor.rotation_epoch > anchor.rotation_epoch {
                return Ok(());
            }
        }

        self.evict_stale_locked(&mut state, now);
        if !state.anchors.contains_key(&issuer) && state.anchors.len() >= self.max_anchors {
            let lru = state
                .anchors
                .iter()
                .min_by_key(|(_, c)| c.last_used.load(Ordering::Relaxed))
                .map(|(k, _)| k.clone());
            if let Some(lru) = lru {
                log::debug!("trust anchor cache full, evicting {lru}");
                state.anchors.remove(&lru);
            }
        }

        state.anchors.insert(
            issuer,
            CachedAnchor {
                anchor,
                last_used: AtomicU64::new(now),
            },
        );
        Ok(())
    }

    fn evict_stale_locked(&self, state: &mut CacheState, now: u64) -> usize {
        let before = state.anchors.len();
        state
            .anchors
            .retain(|_, c| !self.is_expired(c.last_used.load(Ordering::Relaxed), now));
        before - state.anchors.len()
    }

    fn is_expired(&self, last_used: u64, now: u64) -> bool {
        now.saturating_sub(last_used) > self.retention_secs
    }

    /// Fetch from the key source on a worker thread, giving up after the
    /// fetch timeout. Every failure surfaces as `UnknownIssuer`.
    fn fetch_bounded(&self, issuer: &str, now: u64) -> Result<KeySet> {
        let poisoned = || AuthError::UnknownIssuer(format!("{issuer} (fetch slot poisoned)"));
        let pending = self.join_or_start_fetch(issuer)?;
        let slot = pending.result.lock().map_err(|_| poisoned())?;
        let (slot, _) = pending
            .done
            .wait_timeout_while(slot, self.fetch_timeout, |r| r.is_none())
            .map_err(|_| poisoned())?;

        match slot.as_ref() {
            Some(Ok(set)) if set.keys.is_empty() => {
                log::warn!("key source returned no keys for {issuer}");
                Err(AuthError::UnknownIssuer(issuer.to_string()))
            }
            Some(Ok(set)) => Ok(set.clone()),
            Some(Err(e)) => {
                log::warn!("key source has no anchor for {issuer}: {e}");
                Err(AuthError::UnknownIssuer(issuer.to_string()))
            }
            None => {
                log::warn!(
                    "key source timed out after {:?} resolving {issuer}",
                    self.fetch_timeout
                );
                self.mark_unreachable(issuer, now);
                Err(AuthError::UnknownIssuer(format!("{issuer} (key source timed out)")))
            }
        }
    }

    /// The running fetch for `issuer`, starting one if none is in flight.
    fn join_or_start_fetch(&self, issuer: &str) -> Result<Arc<PendingFetch>> {
        let mut inflight = self
            .inflight
            .lock()
            .map_err(|_| AuthError::UnknownIssuer(format!("{issuer} (fetch table poisoned)")))?;
        if let Some(pending) = inflight.get(issuer) {
            log::debug!("joining in-flight fetch for {issuer}");
            return Ok(Arc::clone(pending));
        }

        let pending = Arc::new(PendingFetch::default());
        let slot = Arc::clone(&pending);
        let table = Arc::clone(&self.inflight);
        let source = Arc::clone(&self.source);
        let owned = issuer.to_string();
        std::thread::Builder::new()
            .name("anchor-fetch".into())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| source.fetch(&owned)))
                    .unwrap_or_else(|_| {
                        Err(AuthError::UnknownIssuer(format!("{owned} (key source panicked)")))
                    });
                // Unlist before publishing so no later miss joins a finished fetch.
                if let Ok(mut table) = table.lock() {
                    if table.get(&owned).is_some_and(|p| Arc::ptr_eq(p, &slot)) {
                        table.remove(&owned);
                    }
                }
                if let Ok(mut r) = slot.result.lock() {
                    *r = Some(result);
                }
                slot.done.notify_all();
            })
            .map_err(|e| AuthError::UnknownIssuer(format!("{issuer} (fetch not started: {e})")))?;

        inflight.insert(issuer.to_string(), Arc::clone(&pending));
        Ok(pending)
    }
}
