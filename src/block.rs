//! Address record block (§4.1): the immutable, shared record stored in the
//! cache. Two lookups that return the same block return the same `Arc`
//! pointer, which gives callers identity comparison via `Arc::ptr_eq`
//! without any manual refcounting.

use std::net::IpAddr;
use std::time::Instant;

use crate::error::{Result, ResolverError};

const MAX_NAME_LEN: usize = 255;

/// A flat, immutable record: a hostname plus every IPv4/IPv6 address it
/// resolved to, and an absolute (monotonic) expiry.
///
/// Laid out as a header plus two owned address arrays rather than one
/// hand-packed allocation (§3.1/§9) — cache locality is not the bottleneck
/// here, and the split keeps every accessor safe.
#[derive(Debug)]
pub struct Block {
    name: Box<str>,
    expiry: Instant,
    v4: Box<[[u8; 4]]>,
    v6: Box<[[u8; 16]]>,
}

impl Block {
    /// Builds a block from a resolved address chain. Entries that are
    /// neither V4 nor V6 never occur in `std::net::IpAddr`, so unlike the
    /// C source there is nothing to skip; the only failure mode is an
    /// empty chain or an out-of-range name.
    pub fn new(name: &str, addrs: impl IntoIterator<Item = IpAddr>, expiry: Instant) -> Result<Self> {
        validate_name(name)?;

        let mut v4 = Vec::new();
        let mut v6 = Vec::new();
        for addr in addrs {
            match addr {
                IpAddr::V4(a) => v4.push(a.octets()),
                IpAddr::V6(a) => v6.push(a.octets()),
            }
        }

        if v4.is_empty() && v6.is_empty() {
            return Err(ResolverError::InvalidArgument(
                "address chain yielded no usable A or AAAA record".into(),
            ));
        }

        Ok(Block {
            name: name.into(),
            expiry,
            v4: v4.into_boxed_slice(),
            v6: v6.into_boxed_slice(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expiry(&self) -> Instant {
        self.expiry
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry <= now
    }

    pub fn nr_i4(&self) -> usize {
        self.v4.len()
    }

    pub fn nr_i6(&self) -> usize {
        self.v6.len()
    }

    /// Base pointer to the packed 4-byte IPv4 array (§6).
    pub fn i4(&self) -> &[[u8; 4]] {
        &self.v4
    }

    /// Base pointer to the packed 16-byte IPv6 array (§6).
    pub fn i6(&self) -> &[[u8; 16]] {
        &self.v6
    }

    pub fn first_v6(&self) -> Option<[u8; 16]> {
        self.v6.first().copied()
    }

    pub fn first_v4(&self) -> Option<[u8; 4]> {
        self.v4.first().copied()
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ResolverError::InvalidArgument(format!(
            "hostname length {} out of range [1, {}]",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    Ok(())
}
