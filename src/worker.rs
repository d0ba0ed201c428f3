//! Worker pool (§4.4): N blocking-resolver threads consuming a FIFO
//! request queue guarded by a mutex and condition variable. No lock is
//! ever held across the blocking lookup (§5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::cache::Cache;
use crate::error::ResolverError;
use crate::request::Request;
use crate::resolve::Resolved;

pub(crate) type ResolveFn = dyn Fn(&str, &str) -> std::result::Result<Resolved, i32> + Send + Sync;

struct QueueInner {
    items: VecDeque<Arc<Request>>,
    shutdown: bool,
}

/// The FIFO queue shared by the context's `queue()` producer side and the
/// worker pool's consumer side.
pub(crate) struct Queue {
    inner: Mutex<QueueInner>,
    condvar: Condvar,
    depth: AtomicUsize,
}

impl Queue {
    fn new() -> Self {
        Queue {
            inner: Mutex::new(QueueInner { items: VecDeque::new(), shutdown: false }),
            condvar: Condvar::new(),
            depth: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, req: Arc<Request>) {
        let mut inner = self.inner.lock();
        inner.items.push_back(req);
        self.depth.store(inner.items.len(), Ordering::Relaxed);
        self.condvar.notify_one();
    }

    pub(crate) fn len(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Blocks until a request is available or shutdown is requested.
    /// Returns `None` exactly when shutdown has been requested and the
    /// queue has been fully drained by this worker's cancellation pass.
    fn pop_or_wait(&self) -> Option<Arc<Request>> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(req) = inner.items.pop_front() {
                self.depth.store(inner.items.len(), Ordering::Relaxed);
                return Some(req);
            }
            if inner.shutdown {
                return None;
            }
            self.condvar.wait(&mut inner);
        }
    }

    pub(crate) fn shutdown(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = true;
        self.condvar.notify_all();
    }

    /// Drains whatever is left in the queue. Called once by each worker
    /// after observing shutdown, so every queued-but-not-yet-running
    /// request is completed with `Cancelled` (§5).
    fn drain(&self) -> Vec<Arc<Request>> {
        let mut inner = self.inner.lock();
        let drained: Vec<_> = inner.items.drain(..).collect();
        self.depth.store(0, Ordering::Relaxed);
        drained
    }
}

pub(crate) struct WorkerPool {
    queue: Arc<Queue>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub(crate) fn spawn(
        nr_workers: usize,
        resolve_fn: Arc<ResolveFn>,
        cache: Option<Arc<Cache>>,
        cache_expiry: Option<Duration>,
        prefer_ipv6: bool,
    ) -> Self {
        let queue = Arc::new(Queue::new());
        let mut handles = Vec::with_capacity(nr_workers);
        for id in 0..nr_workers.max(1) {
            let queue = Arc::clone(&queue);
            let resolve_fn = Arc::clone(&resolve_fn);
            let cache = cache.clone();
            handles.push(
                std::thread::Builder::new()
                    .name(format!("gwp-resolver-worker-{id}"))
                    .spawn(move || worker_loop(id, queue, resolve_fn, cache, cache_expiry, prefer_ipv6))
                    .expect("failed to spawn resolver worker thread"),
            );
        }
        WorkerPool { queue, handles: Mutex::new(handles) }
    }

    pub(crate) fn queue_handle(&self) -> Arc<Queue> {
        Arc::clone(&self.queue)
    }

    pub(crate) fn depth(&self) -> usize {
        self.queue.len()
    }

    /// Signals shutdown and joins every worker. Idempotent: a second call
    /// finds an empty handle list and returns immediately.
    pub(crate) fn shutdown_and_join(&self) {
        self.queue.shutdown();
        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    id: usize,
    queue: Arc<Queue>,
    resolve_fn: Arc<ResolveFn>,
    cache: Option<Arc<Cache>>,
    cache_expiry: Option<Duration>,
    prefer_ipv6: bool,
) {
    tracing::debug!(worker = id, "resolver worker started");
    loop {
        let req = match queue.pop_or_wait() {
            Some(req) => req,
            None => break,
        };
        service_request(&req, &resolve_fn, cache.as_deref(), cache_expiry, prefer_ipv6);
    }

    for req in queue.drain() {
        req.complete(Err(ResolverError::Cancelled));
    }
    tracing::debug!(worker = id, "resolver worker exiting");
}

fn service_request(
    req: &Request,
    resolve_fn: &ResolveFn,
    cache: Option<&Cache>,
    cache_expiry: Option<Duration>,
    prefer_ipv6: bool,
) {
    match resolve_fn(req.name(), req.service()) {
        Ok(resolved) => {
            if let (Some(cache), Some(expiry)) = (cache, cache_expiry) {
                if let Err(e) = cache.insert(req.name(), resolved.addrs.iter().copied(), Instant::now() + expiry) {
                    // Allocation/validation failure during cache insert is
                    // nonfatal (§4.4): the lookup result is still delivered.
                    tracing::debug!(name = req.name(), error = %e, "cache insert skipped");
                }
            }
            let endpoint = crate::select_endpoint(&resolved.addrs, resolved.port, prefer_ipv6);
            match endpoint {
                Some(ep) => req.complete(Ok(ep)),
                None => req.complete(Err(ResolverError::NotFound)),
            }
        }
        Err(code) => req.complete(Err(ResolverError::Resolver(code))),
    }
}
