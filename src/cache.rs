//! Resolution cache (§4.2): a bucketed, reference-counted, expiring map
//! from hostname to address block.
//!
//! A single [`parking_lot::Mutex`] guards the whole bucket array, matching
//! the design notes' allowance that per-bucket locking is an optimization,
//! not a requirement, given lookups are O(bucket length) and hold the lock
//! only across a short scan.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::block::{validate_name, Block};
use crate::error::{Result, ResolverError};

/// One bucket: a small chain of blocks that hashed to the same slot.
/// Modeled as a `Vec` rather than a hand-linked list — the C source's
/// singly-linked chain exists to avoid a second allocation per node,
/// which Rust's `Vec` already amortizes.
type Bucket = Vec<Arc<Block>>;

pub struct Cache {
    buckets: Mutex<Box<[Bucket]>>,
    mask: usize,
}

impl Cache {
    /// Allocates the bucket array. `nr_buckets` is rounded up to the next
    /// power of two so bucket selection can mask instead of mod.
    pub fn new(nr_buckets: usize) -> Result<Self> {
        if nr_buckets == 0 {
            return Err(ResolverError::InvalidArgument("nr_buckets must be >= 1".into()));
        }
        let nr_buckets = nr_buckets.next_power_of_two();
        let buckets = vec![Bucket::new(); nr_buckets].into_boxed_slice();
        Ok(Cache {
            buckets: Mutex::new(buckets),
            mask: nr_buckets - 1,
        })
    }

    fn bucket_index(&self, name: &str) -> usize {
        fnv1a(name.as_bytes()) as usize & self.mask
    }

    /// Builds a new block and publishes it in place of any existing block
    /// for the same name. The old block, if any, is unlinked from the
    /// bucket; holders that already acquired a reference to it keep it
    /// alive via their own `Arc` clone until they drop it.
    pub fn insert(&self, name: &str, addrs: impl IntoIterator<Item = IpAddr>, expiry: Instant) -> Result<()> {
        validate_name(name)?;
        let block = Arc::new(Block::new(name, addrs, expiry)?);

        let idx = self.bucket_index(name);
        let mut buckets = self.buckets.lock();
        let bucket = &mut buckets[idx];
        bucket.retain(|b| b.name() != name);
        bucket.push(block);
        Ok(())
    }

    /// Looks up `name`. Distinguishes a plain miss (`NotFound`) from a
    /// stale hit (`TimedOut`) so callers can choose to re-resolve versus
    /// treat the miss as a negative cache hit.
    pub fn getent(&self, name: &str) -> Result<Arc<Block>> {
        validate_name(name)?;
        let idx = self.bucket_index(name);
        let mut buckets = self.buckets.lock();
        let bucket = &mut buckets[idx];

        let pos = bucket.iter().position(|b| b.name() == name);
        let pos = match pos {
            Some(p) => p,
            None => return Err(ResolverError::NotFound),
        };

        if bucket[pos].is_expired(Instant::now()) {
            bucket.remove(pos);
            return Err(ResolverError::TimedOut);
        }

        Ok(Arc::clone(&bucket[pos]))
    }

    /// Releases one reference. In Rust this is simply `drop`; the method
    /// exists so callers have an explicit counterpart to `getent`,
    /// matching the abstract contract's `putent`. Accepting `None` is a
    /// no-op, matching the null-handle contract.
    pub fn putent(&self, _entry: Option<Arc<Block>>) {}

    /// Scans every bucket and unlinks every block whose expiry has
    /// passed. Holders that already hold a reference keep it valid.
    pub fn housekeep(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let mut removed = 0usize;
        for bucket in buckets.iter_mut() {
            let before = bucket.len();
            bucket.retain(|b| !b.is_expired(now));
            removed += before - bucket.len();
        }
        if removed > 0 {
            tracing::debug!(removed, "cache housekeeping swept expired blocks");
        }
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.mask + 1
    }
}

/// FNV-1a, identical for insert and lookup per §4.2.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> [IpAddr; 1] {
        [IpAddr::V4(Ipv4Addr::new(a, b, c, d))]
    }

    #[test]
    fn init_rounds_to_power_of_two() {
        let cache = Cache::new(5).unwrap();
        assert_eq!(cache.bucket_count(), 8);
        let cache = Cache::new(1).unwrap();
        assert_eq!(cache.bucket_count(), 1);
    }

    #[test]
    fn init_rejects_zero_buckets() {
        assert!(Cache::new(0).is_err());
    }

    #[test]
    fn getent_distinguishes_miss_from_timeout() {
        let cache = Cache::new(128).unwrap();
        cache.insert("e", v4(127, 0, 0, 1), Instant::now() - Duration::from_secs(1)).unwrap();
        cache.insert("f", v4(127, 0, 0, 1), Instant::now() + Duration::from_secs(300)).unwrap();

        assert!(matches!(cache.getent("e"), Err(ResolverError::TimedOut)));
        assert!(matches!(cache.getent("nonexistent"), Err(ResolverError::NotFound)));
        assert!(cache.getent("f").is_ok());
    }

    #[test]
    fn replacement_produces_a_new_block_and_keeps_old_alive_for_holders() {
        let cache = Cache::new(128).unwrap();
        cache.insert("x", v4(1, 1, 1, 1), Instant::now() + Duration::from_secs(300)).unwrap();
        let e1 = cache.getent("x").unwrap();
        cache.insert("x", v4(2, 2, 2, 2), Instant::now() + Duration::from_secs(400)).unwrap();
        let e2 = cache.getent("x").unwrap();

        assert!(!Arc::ptr_eq(&e1, &e2));
        assert_eq!(e1.i4()[0], [1, 1, 1, 1]);
        assert_eq!(e2.i4()[0], [2, 2, 2, 2]);
        cache.putent(Some(e1));
        cache.putent(Some(e2));
    }

    #[test]
    fn putent_none_is_a_no_op() {
        let cache = Cache::new(4).unwrap();
        cache.putent(None);
    }

    #[test]
    fn housekeeping_removes_only_expired_blocks() {
        let cache = Cache::new(128).unwrap();
        let now = Instant::now();
        cache.insert("expired1", v4(1, 1, 1, 1), now - Duration::from_secs(10)).unwrap();
        cache.insert("expired2", v4(1, 1, 1, 1), now - Duration::from_secs(5)).unwrap();
        cache.insert("valid1", v4(1, 1, 1, 1), now + Duration::from_secs(300)).unwrap();
        cache.insert("valid2", v4(1, 1, 1, 1), now + Duration::from_secs(600)).unwrap();

        cache.housekeep();

        assert!(matches!(cache.getent("expired1"), Err(ResolverError::NotFound)));
        assert!(matches!(cache.getent("expired2"), Err(ResolverError::NotFound)));
        assert!(cache.getent("valid1").is_ok());
        assert!(cache.getent("valid2").is_ok());
    }

    #[test]
    fn hash_collisions_do_not_lose_entries() {
        let cache = Cache::new(4).unwrap();
        let expiry = Instant::now() + Duration::from_secs(300);
        for i in 0..20 {
            let key = format!("collision{i}.local");
            cache.insert(&key, v4(10, 0, 0, i as u8), expiry).unwrap();
        }
        for i in 0..20 {
            let key = format!("collision{i}.local");
            let entry = cache.getent(&key).unwrap();
            assert_eq!(entry.name(), key);
        }
    }

    #[test]
    fn insert_rejects_invalid_names_and_empty_chains() {
        let cache = Cache::new(128).unwrap();
        let expiry = Instant::now() + Duration::from_secs(300);
        assert!(cache.insert("", v4(1, 1, 1, 1), expiry).is_err());
        let long = "a".repeat(300);
        assert!(cache.insert(&long, v4(1, 1, 1, 1), expiry).is_err());
        assert!(cache.insert("empty.local", std::iter::empty(), expiry).is_err());
    }
}
