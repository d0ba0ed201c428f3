//! Resolver configuration (§4.5 "init(config)"). A plain struct the host
//! constructs directly — the core owns no file-based config loading, that
//! belongs to the proxy binary embedding this crate.

use std::sync::Arc;

use crate::resolve::{system_resolve, Resolved};
use crate::worker::ResolveFn;

/// `Config::default()` gives every field a sane value; only `resolve_fn`
/// needs overriding in tests that want a deterministic stub resolver.
#[derive(Clone)]
pub struct Config {
    /// Number of blocking-resolver worker threads. Must be >= 1.
    pub nr_workers: usize,
    /// Number of cache buckets. 0 disables the cache entirely.
    pub cache_buckets: usize,
    /// TTL applied to results the worker pool installs into the cache.
    /// 0 disables caching of results (the cache structure may still
    /// exist and be driven directly through [`crate::Cache`] if
    /// `cache_buckets > 0`).
    pub cache_expiry_seconds: u64,
    /// Endpoint-selection preference (§4.3): IPv6-then-IPv4 when true,
    /// IPv4-only ordering otherwise.
    pub prefer_ipv6: bool,
    /// The blocking, synchronous name-resolution function (§4.7). Hosts
    /// may substitute their own; defaults to `getaddrinfo`.
    pub resolve_fn: Arc<ResolveFn>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nr_workers: num_cpus::get().max(1),
            cache_buckets: 1024,
            cache_expiry_seconds: 300,
            prefer_ipv6: true,
            resolve_fn: Arc::new(
                |name: &str, service: &str| -> std::result::Result<Resolved, i32> {
                    system_resolve(name, service)
                },
            ),
        }
    }
}
