//! Async name-resolution subsystem for a TCP forward proxy.
//!
//! Turns a `(hostname, service)` pair into connectable socket addresses
//! without blocking the proxy's I/O event loop: [`ResolverContext::queue`]
//! hands the caller a [`Request`] carrying a completion file descriptor
//! that becomes readable once a worker thread (or an immediate cache hit)
//! has resolved the name. A bucketed [`Cache`] remembers recent answers so
//! repeat lookups for the same name skip the worker pool entirely.
//!
//! ```no_run
//! use gwp_resolver::{Config, ResolverContext};
//!
//! let ctx = ResolverContext::init(Config::default()).unwrap();
//! let req = ctx.queue("example.com", "80").unwrap();
//! // Register req.completion_fd() with your reactor; once readable:
//! req.drain_completion().unwrap();
//! match req.result().unwrap() {
//!     Ok(endpoint) => println!("resolved to {:?}", endpoint.to_socket_addr()),
//!     Err(e) => eprintln!("resolution failed: {e}"),
//! }
//! ctx.entry_put(Some(req));
//! ```

pub mod block;
pub mod cache;
pub mod completion;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod request;
pub mod resolve;
mod worker;

pub use block::Block;
pub use cache::Cache;
pub use completion::CompletionHandle;
pub use config::Config;
pub use context::ResolverContext;
pub use endpoint::Endpoint;
pub use error::{Result, ResolverError};
pub use request::Request;

use std::net::IpAddr;

/// Picks one endpoint from a resolved address list (§4.3): IPv6-then-IPv4
/// when the host prefers IPv6, IPv4-only ordering otherwise. Shared by the
/// worker path (a fresh resolution) and the cache-hit path (a stored
/// block), so both observe the same preference.
pub(crate) fn select_endpoint(addrs: &[IpAddr], port: u16, prefer_ipv6: bool) -> Option<Endpoint> {
    let v4 = addrs.iter().find_map(|a| match a {
        IpAddr::V4(a) => Some(a.octets()),
        _ => None,
    });
    let v6 = addrs.iter().find_map(|a| match a {
        IpAddr::V6(a) => Some(a.octets()),
        _ => None,
    });

    if prefer_ipv6 {
        v6.map(|addr| Endpoint::v6(addr, port, 0, 0)).or_else(|| v4.map(|addr| Endpoint::v4(addr, port)))
    } else {
        v4.map(|addr| Endpoint::v4(addr, port)).or_else(|| v6.map(|addr| Endpoint::v6(addr, port, 0, 0)))
    }
}
