//! Concurrency test: a shared trust anchor cache under parallel lookups,
//! rotations and evictions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use abstract_account::crypto::keys::Ed25519KeyPair;
use abstract_account::{
    AnchorKey, AuthError, EngineConfig, KeySet, KeySource, Result, StaticKeySource,
    TrustAnchorResolver,
};

const NOW: u64 = 1_700_000_000;

fn key_set(epoch: u64) -> KeySet {
    KeySet::new(
        vec![AnchorKey::new(*Ed25519KeyPair::generate().verifying_key())],
        epoch,
    )
}

#[test]
fn stress_100_threads_share_one_fetch() {
    let source = Arc::new(StaticKeySource::new());
    source.publish("issuer", key_set(0));
    let resolver = Arc::new(TrustAnchorResolver::new(
        source.clone(),
        &EngineConfig::default(),
    ));

    // Warm the cache, then hammer it.
    resolver.resolve_at("issuer", NOW).unwrap();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let resolver = Arc::clone(&resolver);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let anchor = resolver.resolve_at("issuer", NOW + i).unwrap();
                assert_eq!(anchor.issuer, "issuer");
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(resolver.len(), 1);
}

#[test]
fn stress_readers_see_whole_key_sets_during_rotation() {
    let source = Arc::new(StaticKeySource::new());
    source.publish("issuer", key_set(0));
    let resolver = Arc::new(TrustAnchorResolver::new(
        source.clone(),
        &EngineConfig::default(),
    ));
    let barrier = Arc::new(Barrier::new(9));

    let mut readers = Vec::new();
    for _ in 0..8 {
        let resolver = Arc::clone(&resolver);
        let barrier = Arc::clone(&barrier);
        readers.push(thread::spawn(move || {
            barrier.wait();
            let mut last_epoch = 0;
            for _ in 0..500 {
                let anchor = resolver.resolve_at("issuer", NOW).unwrap();
                // Every observed anchor is one complete published set.
                assert_eq!(anchor.keys.len(), 1);
                assert!(anchor.rotation_epoch >= last_epoch);
                last_epoch = anchor.rotation_epoch;
            }
        }));
    }

    barrier.wait();
    for _ in 0..20 {
        let epoch = source
            .rotate(
                "issuer",
                vec![AnchorKey::new(*Ed25519KeyPair::generate().verifying_key())],
            )
            .unwrap();
        resolver.notify_rotation("issuer", epoch);
    }
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(resolver.resolve_at("issuer", NOW).unwrap().rotation_epoch, 20);
}

#[test]
fn stress_many_issuers_respect_capacity() {
    let source = Arc::new(StaticKeySource::new());
    for i in 0..64 {
        source.publish(format!("issuer-{i}"), key_set(0));
    }
    let config = EngineConfig {
        max_anchors: 16,
        ..EngineConfig::default()
    };
    let resolver = Arc::new(TrustAnchorResolver::new(source, &config));

    let mut handles = Vec::new();
    for t in 0..8u64 {
        let resolver = Arc::clone(&resolver);
        handles.push(thread::spawn(move || {
            for i in 0..64u64 {
                let issuer = format!("issuer-{}", (i + t * 8) % 64);
                resolver.resolve_at(&issuer, NOW + i).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert!(resolver.len() <= 16);
}

/// Source that fails its first `failures` fetches.
struct FlakySource {
    inner: StaticKeySource,
    failures: usize,
    calls: AtomicUsize,
}

impl KeySource for FlakySource {
    fn fetch(&self, issuer: &str) -> Result<KeySet> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            thread::sleep(Duration::from_millis(5));
            return Err(AuthError::UnknownIssuer(format!("{issuer} (unreachable)")));
        }
        self.inner.fetch(issuer)
    }
}

#[test]
fn stress_failed_fetches_are_not_cached() {
    let inner = StaticKeySource::new();
    inner.publish("issuer", key_set(0));
    let source = Arc::new(FlakySource {
        inner,
        failures: 3,
        calls: AtomicUsize::new(0),
    });
    let resolver = TrustAnchorResolver::new(source, &EngineConfig::default());

    for _ in 0..3 {
        assert!(matches!(
            resolver.resolve_at("issuer", NOW),
            Err(AuthError::UnknownIssuer(_))
        ));
        assert!(resolver.is_empty());
    }
    assert!(resolver.resolve_at("issuer", NOW).is_ok());
    assert_eq!(resolver.len(), 1);
}

/// Source whose fetches block until released.
#[derive(Default)]
struct GatedSource {
    calls: AtomicUsize,
    open: Mutex<bool>,
    opened: Condvar,
}

impl GatedSource {
    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl KeySource for GatedSource {
    fn fetch(&self, _issuer: &str) -> Result<KeySet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let open = self.open.lock().unwrap();
        let _open = self.opened.wait_while(open, |o| !*o).unwrap();
        Ok(key_set(0))
    }
}

#[test]
fn stress_concurrent_misses_share_one_fetch() {
    let source = Arc::new(GatedSource::default());
    let resolver = Arc::new(TrustAnchorResolver::new(
        source.clone(),
        &EngineConfig::default(),
    ));
    let barrier = Arc::new(Barrier::new(51));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let resolver = Arc::clone(&resolver);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            resolver.resolve_at("issuer", NOW).unwrap().rotation_epoch
        }));
    }
    barrier.wait();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(resolver.fetches_in_flight(), 1);
    source.release();

    for h in handles {
        assert_eq!(h.join().unwrap(), 0);
    }
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.len(), 1);
}

#[test]
fn stress_hung_source_does_not_grow_fetches() {
    let source = Arc::new(GatedSource::default());
    let config = EngineConfig {
        fetch_timeout_ms: 20,
        ..EngineConfig::default()
    };
    let resolver = Arc::new(TrustAnchorResolver::new(source.clone(), &config));

    let mut handles = Vec::new();
    for t in 0..8u64 {
        let resolver = Arc::clone(&resolver);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let result = resolver.resolve_at("hung", NOW + (t + i) % 3);
                assert!(matches!(result, Err(AuthError::UnknownIssuer(_))));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.fetches_in_flight(), 1);
    source.release();
}
