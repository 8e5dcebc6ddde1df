use std::net::IpAddr;
use thiserror::Error;

use crate::models::IpFamily;

/// Reasons a lease event is rejected. Every variant is terminal for the event
/// and guarantees no discovered record was written.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("No such origin: {0}")]
    NoSuchOrigin(String),

    #[error("Unknown lease action: {0}")]
    UnknownLeaseAction(String),

    #[error("No subnet exists for: {0}")]
    NoSubnetFound(IpAddr),

    #[error("Family for the subnet does not match. Expected: {expected}")]
    FamilyMismatch { expected: IpFamily, asserted: IpFamily },

    #[error("Malformed lease event: {0}")]
    MalformedEvent(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl LeaseError {
    /// Stable label for logs and counters
    pub fn kind(&self) -> &'static str {
        match self {
            LeaseError::NoSuchOrigin(_) => "no_such_origin",
            LeaseError::UnknownLeaseAction(_) => "unknown_lease_action",
            LeaseError::NoSubnetFound(_) => "no_subnet_found",
            LeaseError::FamilyMismatch { .. } => "family_mismatch",
            LeaseError::MalformedEvent(_) => "malformed_event",
            LeaseError::Backend(_) => "backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = LeaseError::FamilyMismatch { expected: IpFamily::Ipv4, asserted: IpFamily::Ipv6 };
        assert_eq!(err.to_string(), "Family for the subnet does not match. Expected: ipv4");
        assert_eq!(err.kind(), "family_mismatch");

        let err = LeaseError::NoSubnetFound("10.9.9.9".parse().unwrap());
        assert_eq!(err.to_string(), "No subnet exists for: 10.9.9.9");

        let err = LeaseError::NoSuchOrigin("c9".into());
        assert_eq!(err.to_string(), "No such origin: c9");
    }
}
