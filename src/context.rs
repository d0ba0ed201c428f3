//! Resolver context (§4.5): ties the cache, the queue, and the worker
//! pool together, owns their lifecycle, and enforces shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::block::validate_name;
use crate::cache::Cache;
use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::error::{Result, ResolverError};
use crate::request::Request;
use crate::resolve::service_to_port;
use crate::worker::WorkerPool;

pub struct ResolverContext {
    cache: Option<Arc<Cache>>,
    cache_expiry: Option<Duration>,
    pool: WorkerPool,
    prefer_ipv6: bool,
    housekeeper: Mutex<Option<JoinHandle<()>>>,
    housekeeper_shutdown: Arc<AtomicBool>,
    freed: AtomicBool,
}

impl ResolverContext {
    /// Spawns `config.nr_workers` workers and, if caching is enabled,
    /// builds the cache and schedules housekeeping at
    /// `max(1, cache_expiry_seconds / 4)` seconds; a TTL of 0 disables
    /// housekeeping (§4.5).
    pub fn init(config: Config) -> Result<Arc<ResolverContext>> {
        if config.nr_workers == 0 {
            return Err(ResolverError::InvalidArgument("nr_workers must be >= 1".into()));
        }

        let cache = if config.cache_buckets > 0 {
            Some(Arc::new(Cache::new(config.cache_buckets)?))
        } else {
            None
        };
        let cache_expiry = if config.cache_expiry_seconds > 0 {
            Some(Duration::from_secs(config.cache_expiry_seconds))
        } else {
            None
        };

        let pool = WorkerPool::spawn(
            config.nr_workers,
            Arc::clone(&config.resolve_fn),
            cache.clone(),
            cache_expiry,
            config.prefer_ipv6,
        );

        let housekeeper_shutdown = Arc::new(AtomicBool::new(false));
        let housekeeper = if let (Some(cache), true) = (cache.clone(), config.cache_expiry_seconds > 0) {
            let interval = Duration::from_secs((config.cache_expiry_seconds / 4).max(1));
            let shutdown = Arc::clone(&housekeeper_shutdown);
            Some(
                std::thread::Builder::new()
                    .name("gwp-resolver-housekeeper".into())
                    .spawn(move || housekeeper_loop(cache, interval, shutdown))
                    .expect("failed to spawn housekeeper thread"),
            )
        } else {
            None
        };

        Ok(Arc::new(ResolverContext {
            cache,
            cache_expiry,
            pool,
            prefer_ipv6: config.prefer_ipv6,
            housekeeper: Mutex::new(housekeeper),
            housekeeper_shutdown,
            freed: AtomicBool::new(false),
        }))
    }

    /// Constructs a request, consults the cache on a cache hit completes
    /// it synchronously (still readable through its handle); on a miss,
    /// links it into the worker queue and returns (§4.5).
    pub fn queue(&self, name: &str, service: &str) -> Result<Arc<Request>> {
        // §6: the name-length invariant applies to every `queue` call,
        // cache enabled or not — `Cache::getent` enforces it on a hit path,
        // but a disabled cache must not let it slip through unchecked.
        validate_name(name)?;
        let req = Request::new(name, service)?;

        if let Some(cache) = &self.cache {
            match cache.getent(name) {
                Ok(block) => {
                    let port = service_to_port(service).map_err(ResolverError::Resolver);
                    let endpoint = port.and_then(|port| {
                        select_block_endpoint(&block, port, self.prefer_ipv6)
                            .ok_or(ResolverError::NotFound)
                    });
                    req.complete(endpoint);
                    return Ok(req);
                }
                Err(ResolverError::NotFound) | Err(ResolverError::TimedOut) => {
                    // Fall through to the worker path.
                }
                Err(e) => return Err(e),
            }
        }

        self.pool.queue_handle().push(Arc::clone(&req));
        Ok(req)
    }

    /// A direct, synchronous cache probe that does not enqueue on miss
    /// (§4.5).
    pub fn cache_lookup(&self, name: &str, service: &str) -> Result<Endpoint> {
        let cache = self.cache.as_ref().ok_or(ResolverError::NotFound)?;
        let block = cache.getent(name)?;
        let port = service_to_port(service).map_err(ResolverError::Resolver)?;
        select_block_endpoint(&block, port, self.prefer_ipv6).ok_or(ResolverError::NotFound)
    }

    /// Releases one caller reference. `None` is a no-op, matching the
    /// null-handle contract (§8).
    pub fn entry_put(&self, request: Option<Arc<Request>>) {
        drop(request);
    }

    /// Runs one expiry sweep over the cache. Host-callable directly
    /// (§4.6) regardless of whether the dedicated housekeeper thread is
    /// also running.
    pub fn housekeep(&self) {
        if let Some(cache) = &self.cache {
            cache.housekeep();
        }
    }

    pub fn queue_depth(&self) -> usize {
        self.pool.depth()
    }

    /// Signals shutdown, joins every worker and the housekeeper thread if
    /// one was spawned, and drops the cache. Idempotent (§8: `free()`
    /// followed by no further calls leaks nothing; calling it twice is
    /// safe).
    pub fn free(&self) {
        if self.freed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pool.shutdown_and_join();
        self.housekeeper_shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.housekeeper.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ResolverContext {
    fn drop(&mut self) {
        self.free();
    }
}

fn housekeeper_loop(cache: Arc<Cache>, interval: Duration, shutdown: Arc<AtomicBool>) {
    // No dedicated wakeup channel: the spec only requires that shutdown is
    // observed "eventually" (§4.6 leaves the mechanism to the
    // implementation), so a capped sleep keeps join() latency bounded.
    let step = interval.min(Duration::from_millis(200));
    let mut elapsed = Duration::ZERO;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(step);
        elapsed += step;
        if elapsed >= interval {
            elapsed = Duration::ZERO;
            cache.housekeep();
        }
    }
}

fn select_block_endpoint(block: &crate::block::Block, port: u16, prefer_ipv6: bool) -> Option<Endpoint> {
    if prefer_ipv6 {
        if let Some(addr) = block.first_v6() {
            return Some(Endpoint::v6(addr, port, 0, 0));
        }
        block.first_v4().map(|addr| Endpoint::v4(addr, port))
    } else {
        if let Some(addr) = block.first_v4() {
            return Some(Endpoint::v4(addr, port));
        }
        block.first_v6().map(|addr| Endpoint::v6(addr, port, 0, 0))
    }
}
