use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

/// Fixed-size pool of mutexes indexed by key hash (lock striping).
///
/// Serializes operations on the same logical key (an unordered user pair, an
/// actor id) without allocating a lock per key. Two distinct keys may share a
/// stripe; that only costs a little contention, never correctness.
pub struct StripedLocks {
    stripes: Vec<Mutex<()>>,
}

impl StripedLocks {
    /// Default stripe count used by the services.
    pub const DEFAULT_STRIPES: usize = 256;

    pub fn new(stripes: usize) -> Self {
        assert!(stripes > 0, "stripe count must be positive");
        Self {
            stripes: (0..stripes).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Acquire the stripe guarding `key`. The guard must not be held across
    /// unrelated long-running work.
    pub async fn lock<K: Hash>(&self, key: &K) -> MutexGuard<'_, ()> {
        self.stripes[self.index_of(key)].lock().await
    }

    fn index_of<K: Hash>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.stripes.len()
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}

/// Canonical key for an unordered pair of ids: both orderings hash alike.
pub fn pair_key<T: Ord + Copy>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
