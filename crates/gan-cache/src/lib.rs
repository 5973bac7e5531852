//! C3 Audit Cache: memoizes reviews by fingerprint with LRU eviction and a
//! read-time TTL (§4.3).

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use gan_core::Review;

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry {
    review: Review,
    stored_at: Instant,
}

/// Process-local, fixed-capacity fingerprint → review cache.
pub struct AuditCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AuditCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// `lookup(fp) → Review?`; entries older than the TTL are evicted on read.
    pub async fn lookup(&self, fingerprint: &str) -> Option<Review> {
        let mut entries = self.entries.lock().await;
        let expired = entries
            .get(fingerprint)
            .is_some_and(|e| e.stored_at.elapsed() > self.ttl);
        if expired {
            entries.pop(fingerprint);
        }
        match entries.get(fingerprint) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.review.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// `store(fp, review)`; overwrites any existing entry for `fp`.
    pub async fn store(&self, fingerprint: String, review: Review) {
        let mut entries = self.entries.lock().await;
        entries.put(
            fingerprint,
            CacheEntry {
                review,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for AuditCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gan_core::Verdict;

    fn sample_review(overall: u32) -> Review {
        Review {
            overall,
            verdict: Verdict::Pass,
            summary: "ok".into(),
            dimensions: vec![],
            inline_comments: vec![],
            citations: vec![],
            proposed_diff: None,
            iterations: 0,
            judge_cards: vec![],
        }
    }

    #[tokio::test]
    async fn store_then_lookup_returns_clone() {
        let cache = AuditCache::new(10, Duration::from_secs(60));
        cache.store("fp1".into(), sample_review(91)).await;
        let hit = cache.lookup("fp1").await.unwrap();
        assert_eq!(hit.overall, 91);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 0);
    }

    #[tokio::test]
    async fn miss_on_unknown_fingerprint_is_counted() {
        let cache = AuditCache::new(10, Duration::from_secs(60));
        assert!(cache.lookup("missing").await.is_none());
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = AuditCache::new(2, Duration::from_secs(60));
        cache.store("a".into(), sample_review(10)).await;
        cache.store("b".into(), sample_review(20)).await;
        cache.store("c".into(), sample_review(30)).await;
        assert!(cache.lookup("a").await.is_none());
        assert!(cache.lookup("b").await.is_some());
        assert!(cache.lookup("c").await.is_some());
    }

    #[tokio::test]
    async fn ttl_expiry_evicts_on_read() {
        let cache = AuditCache::new(10, Duration::from_millis(10));
        cache.store("fp1".into(), sample_review(50)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.lookup("fp1").await.is_none());
    }

}
