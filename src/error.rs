use std::fmt;

/// Status class a quota error maps to at the RPC boundary.
///
/// The outer request layer translates `ResourceExhausted` into its
/// rate-limit response; anything else is a plain request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// A per-tenant limit was hit; the client should back off.
    ResourceExhausted,
    /// A collaborator (catalog, transaction manager) failed.
    Internal,
}

/// Unified error type for quota admission.
#[derive(Debug)]
pub enum Error {
    /// Request rate limit exhausted for the tenant
    RateExceeded,

    /// Write throughput (bytes/sec) limit exhausted for the tenant
    ThroughputExceeded,

    /// Admitting the request would push the tenant past its size cap
    StorageSizeExceeded,

    /// Metadata catalog or transaction failure during a size refresh
    Metadata(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RateExceeded => write!(f, "request rate limit exceeded"),
            Error::ThroughputExceeded => write!(f, "request throughput limit exceeded"),
            Error::StorageSizeExceeded => write!(f, "data size limit exceeded"),
            Error::Metadata(msg) => write!(f, "metadata error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Status class for the outer RPC layer.
    pub fn status(&self) -> StatusClass {
        match self {
            Error::RateExceeded | Error::ThroughputExceeded | Error::StorageSizeExceeded => {
                StatusClass::ResourceExhausted
            }
            Error::Metadata(_) => StatusClass::Internal,
        }
    }
}

/// Result type alias for quota operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::RateExceeded.to_string(), "request rate limit exceeded");
        assert_eq!(
            Error::ThroughputExceeded.to_string(),
            "request throughput limit exceeded"
        );
        assert_eq!(
            Error::StorageSizeExceeded.to_string(),
            "data size limit exceeded"
        );
        assert_eq!(
            Error::Metadata("tenant not found".into()).to_string(),
            "metadata error: tenant not found"
        );
    }

    #[test]
    fn test_status_class() {
        assert_eq!(Error::RateExceeded.status(), StatusClass::ResourceExhausted);
        assert_eq!(
            Error::ThroughputExceeded.status(),
            StatusClass::ResourceExhausted
        );
        assert_eq!(
            Error::StorageSizeExceeded.status(),
            StatusClass::ResourceExhausted
        );
        assert_eq!(
            Error::Metadata("boom".into()).status(),
            StatusClass::Internal
        );
    }
}
