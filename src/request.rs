//! Request object (§3, §4.3): one outstanding lookup, jointly owned by the
//! caller and whichever path — immediate cache hit or worker — will
//! complete it.
//!
//! The C source enforces "write output, fence, then signal the handle" by
//! hand. Here the state lives behind a [`parking_lot::Mutex`]: the
//! worker's unlock is a release, the caller's lock on handle-readiness is
//! an acquire, so the mutex itself supplies the ordering guarantee without
//! a manual fence.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::completion::CompletionHandle;
use crate::endpoint::Endpoint;
use crate::error::{Result, ResolverError};

#[derive(Debug, Clone)]
enum State {
    Pending,
    Completed(std::result::Result<Endpoint, ResolverError>),
}

pub struct Request {
    name: String,
    service: String,
    state: Mutex<State>,
    handle: CompletionHandle,
}

impl Request {
    pub(crate) fn new(name: impl Into<String>, service: impl Into<String>) -> Result<Arc<Request>> {
        Ok(Arc::new(Request {
            name: name.into(),
            service: service.into(),
            state: Mutex::new(State::Pending),
            handle: CompletionHandle::new()?,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// The completion handle's raw descriptor, for registration with the
    /// caller's own readiness multiplexer (§6).
    pub fn completion_fd(&self) -> std::os::unix::io::RawFd {
        self.handle.as_raw_fd()
    }

    /// Writes the result, then signals the handle. Completes the request
    /// exactly once; called by the cache-hit path or by a worker, never
    /// both (§3: "Completed exactly once").
    pub(crate) fn complete(&self, result: std::result::Result<Endpoint, ResolverError>) {
        {
            let mut state = self.state.lock();
            debug_assert!(matches!(*state, State::Pending), "a request must complete exactly once");
            *state = State::Completed(result);
        }
        if let Err(e) = self.handle.signal() {
            tracing::warn!(error = %e, "failed to signal completion handle");
        }
    }

    /// The result, if the request has completed. Does not drain the
    /// handle — callers observing readiness through their multiplexer
    /// should call [`Request::drain_completion`] once before reading this.
    pub fn result(&self) -> Option<std::result::Result<Endpoint, ResolverError>> {
        match &*self.state.lock() {
            State::Pending => None,
            State::Completed(r) => Some(clone_result(r)),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(&*self.state.lock(), State::Completed(_))
    }

    /// Drains the completion handle's single readable token. Must be
    /// called before releasing the request to avoid leaking readability
    /// on fd reuse (§6).
    pub fn drain_completion(&self) -> std::io::Result<bool> {
        self.handle.drain()
    }
}

fn clone_result(r: &std::result::Result<Endpoint, ResolverError>) -> std::result::Result<Endpoint, ResolverError> {
    match r {
        Ok(ep) => Ok(*ep),
        Err(e) => Err(clone_error(e)),
    }
}

fn clone_error(e: &ResolverError) -> ResolverError {
    match e {
        ResolverError::InvalidArgument(s) => ResolverError::InvalidArgument(s.clone()),
        ResolverError::NotFound => ResolverError::NotFound,
        ResolverError::TimedOut => ResolverError::TimedOut,
        ResolverError::OutOfMemory => ResolverError::OutOfMemory,
        ResolverError::Resolver(c) => ResolverError::Resolver(*c),
        ResolverError::Cancelled => ResolverError::Cancelled,
        ResolverError::Io(io) => ResolverError::Io(std::io::Error::new(io.kind(), io.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_is_observable_exactly_once_and_readable_after_result_write() {
        let req = Request::new("localhost", "80").unwrap();
        assert!(req.result().is_none());
        assert_eq!(req.drain_completion().unwrap(), false);

        req.complete(Ok(Endpoint::v4([127, 0, 0, 1], 80)));

        assert_eq!(req.drain_completion().unwrap(), true);
        assert!(req.result().is_some());
        assert_eq!(req.drain_completion().unwrap(), false);
    }

    #[test]
    #[should_panic(expected = "exactly once")]
    fn completing_twice_is_a_bug() {
        let req = Request::new("x", "80").unwrap();
        req.complete(Ok(Endpoint::v4([1, 1, 1, 1], 80)));
        req.complete(Ok(Endpoint::v4([2, 2, 2, 2], 80)));
    }
}
