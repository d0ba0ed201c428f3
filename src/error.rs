use thiserror::Error;

/// Error kinds surfaced by the cache, the resolver context, and the
/// completion-handle plumbing.
///
/// `Resolver` carries the raw numeric code produced by the blocking
/// lookup function (e.g. a `getaddrinfo` `EAI_*` constant); the core
/// never interprets it beyond storing it in the request.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found")]
    NotFound,

    #[error("timed out")]
    TimedOut,

    #[error("out of memory")]
    OutOfMemory,

    #[error("resolver failed with code {0}")]
    Resolver(i32),

    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResolverError>;
