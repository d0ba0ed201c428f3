//! Blocking name-resolution function (§4.7): the host collaborator the
//! spec requires but leaves unspecified. `system_resolve` is the default,
//! built on the platform libc `getaddrinfo`. Hosts with their own
//! resolver (a stub for tests, a split-horizon resolver, …) can supply a
//! different function via [`crate::Config::resolve_fn`].

use std::ffi::CString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ptr;

/// What one blocking resolution yields: every address the name resolved
/// to, plus the port the service string (numeric or a `/etc/services`
/// name) resolved to.
pub struct Resolved {
    pub addrs: Vec<IpAddr>,
    pub port: u16,
}

/// Resolves `name`/`service` via `getaddrinfo`. On failure, returns the
/// raw `EAI_*` code as the spec's "negative result code sourced from the
/// lookup API" (§4.4) — the core never interprets it further than storing
/// it on the request.
pub fn system_resolve(name: &str, service: &str) -> std::result::Result<Resolved, i32> {
    let c_name = CString::new(name).map_err(|_| libc::EAI_NONAME)?;
    let c_service = CString::new(service).map_err(|_| libc::EAI_SERVICE)?;

    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;
    hints.ai_flags = libc::AI_ADDRCONFIG;

    let mut res: *mut libc::addrinfo = ptr::null_mut();
    let rc = unsafe {
        libc::getaddrinfo(c_name.as_ptr(), c_service.as_ptr(), &hints, &mut res)
    };
    if rc != 0 {
        return Err(rc);
    }

    let mut addrs = Vec::new();
    let mut port = 0u16;
    let mut got_port = false;

    let mut cur = res;
    while !cur.is_null() {
        let ai = unsafe { &*cur };
        unsafe {
            match ai.ai_family {
                libc::AF_INET if !ai.ai_addr.is_null() => {
                    let sa = &*(ai.ai_addr as *const libc::sockaddr_in);
                    addrs.push(IpAddr::V4(Ipv4Addr::from(u32::from_be(sa.sin_addr.s_addr as u32))));
                    if !got_port {
                        port = u16::from_be(sa.sin_port as u16);
                        got_port = true;
                    }
                }
                libc::AF_INET6 if !ai.ai_addr.is_null() => {
                    let sa = &*(ai.ai_addr as *const libc::sockaddr_in6);
                    addrs.push(IpAddr::V6(Ipv6Addr::from(sa.sin6_addr.s6_addr)));
                    if !got_port {
                        port = u16::from_be(sa.sin6_port as u16);
                        got_port = true;
                    }
                }
                _ => {}
            }
        }
        cur = ai.ai_next;
    }

    unsafe { libc::freeaddrinfo(res) };

    if addrs.is_empty() {
        return Err(libc::EAI_NONAME);
    }

    Ok(Resolved { addrs, port })
}

/// Resolves a service string to a port without a full address lookup, for
/// [`crate::context::ResolverContext::cache_lookup`] — a cache probe is
/// keyed on the name alone, so it must not pay for a fresh DNS round trip
/// just to learn the port.
pub fn service_to_port(service: &str) -> std::result::Result<u16, i32> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }

    let c_service = CString::new(service).map_err(|_| libc::EAI_SERVICE)?;
    let c_proto = CString::new("tcp").unwrap();
    lookup_service_port(&c_service, &c_proto).ok_or(libc::EAI_SERVICE)
}

/// `getservbyname` returns a pointer into static storage and is not
/// reentrant; §5 requires this crate's API to be thread-safe, and
/// `service_to_port` is reachable concurrently from `queue`'s cache-hit
/// path and from `cache_lookup`. On glibc/Android we use the reentrant
/// `getservbyname_r` instead; other Unix targets don't ship it, so we
/// serialize the unsafe call behind a process-wide mutex.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn lookup_service_port(c_service: &CString, c_proto: &CString) -> Option<u16> {
    let mut result: libc::servent = unsafe { std::mem::zeroed() };
    let mut result_ptr: *mut libc::servent = ptr::null_mut();
    let mut buf = vec![0u8; 1024];

    loop {
        let rc = unsafe {
            libc::getservbyname_r(
                c_service.as_ptr(),
                c_proto.as_ptr(),
                &mut result,
                buf.as_mut_ptr() as *mut libc::c_char,
                buf.len(),
                &mut result_ptr,
            )
        };
        match rc {
            0 if !result_ptr.is_null() => return Some(u16::from_be(result.s_port as u16)),
            0 => return None,
            libc::ERANGE => {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            _ => return None,
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn lookup_service_port(c_service: &CString, c_proto: &CString) -> Option<u16> {
    use std::sync::Mutex;
    static SERVENT_LOOKUP: Mutex<()> = Mutex::new(());

    let _guard = SERVENT_LOOKUP.lock().unwrap();
    unsafe {
        let ent = libc::getservbyname(c_service.as_ptr(), c_proto.as_ptr());
        if ent.is_null() {
            None
        } else {
            Some(u16::from_be((*ent).s_port as u16))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_localhost_to_loopback() {
        let resolved = system_resolve("localhost", "80");
        match resolved {
            Ok(r) => {
                assert!(!r.addrs.is_empty());
                assert!(r.addrs.iter().all(|a| a.is_loopback()));
            }
            Err(code) => {
                // Restricted environments without /etc/hosts or a
                // resolver configured are tolerated, matching the
                // source's test tolerance for network-dependent results.
                assert_ne!(code, 0);
            }
        }
    }

    #[test]
    fn numeric_service_parses_without_a_syscall() {
        assert_eq!(service_to_port("8080").unwrap(), 8080);
    }

    #[test]
    fn unresolvable_host_yields_a_nonzero_code() {
        let resolved = system_resolve("this-host-should-not-resolve.invalid", "80");
        assert!(resolved.is_err());
    }

    #[test]
    fn named_service_resolves_concurrently_without_racing() {
        // Drives the non-numeric path (getservbyname_r / mutex-guarded
        // getservbyname) from several threads at once; a reentrancy bug
        // would show up as a garbled or wrong port under concurrency, not
        // necessarily a crash.
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| service_to_port("http")))
            .collect();

        for h in handles {
            match h.join().unwrap() {
                Ok(port) => assert_eq!(port, 80),
                // Minimal/containerized environments may lack /etc/services.
                Err(_) => {}
            }
        }
    }
}
