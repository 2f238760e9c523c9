//! Response Cache (C7): an in-memory LRU cache keyed by a fingerprint of
//! the request shape, with TTL-based expiry and per-key population locks
//! to avoid a thundering herd of identical in-flight requests all missing
//! the cache at once.
//!
//! Fingerprints bucket temperature rather than using its raw float value,
//! since two requests at `0.71` and `0.73` are close enough to be
//! considered the same cache entry. Blocked-request outcomes are never
//! cached: a request a policy denied this second might legitimately be
//! allowed the next, once budgets reset or context changes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: String,
    pub inserted_at: Instant,
}

pub struct ResponseCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    recency: Mutex<VecDeque<String>>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
            recency: Mutex::new(VecDeque::new()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fingerprints `(model, temperature, system_prompt, user_message)`
    /// into a stable cache key. Temperature is bucketed to one decimal
    /// place so near-identical requests share an entry.
    pub fn fingerprint(model: &str, temperature: f64, system_prompt: &str, user_message: &str) -> String {
        let bucket = (temperature * 10.0).round() as i64;
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(bucket.to_le_bytes());
        hasher.update(system_prompt.as_bytes());
        hasher.update(user_message.as_bytes());
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Returns a lock scoped to `key`, so concurrent lookups for the same
    /// fingerprint serialize on population instead of all calling the
    /// upstream model at once.
    async fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock_for(key).await.lock_owned().await;
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                let response = entry.response.clone();
                drop(entries);
                self.touch(key).await;
                Some(response)
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Inserts `response` under `key`, evicting the least-recently-used
    /// entry first if the cache is at capacity. Callers must never call
    /// this for a blocked or denied outcome.
    pub async fn put(&self, key: &str, response: String) {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let mut recency = self.recency.lock().await;
            if let Some(oldest) = recency.pop_front() {
                entries.remove(&oldest);
            }
        }
        entries.insert(key.to_string(), CacheEntry { response, inserted_at: Instant::now() });
        drop(entries);
        self.touch(key).await;
    }

    async fn touch(&self, key: &str) {
        let mut recency = self.recency.lock().await;
        recency.retain(|k| k != key);
        recency.push_back(key.to_string());
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
