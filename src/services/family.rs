use std::net::IpAddr;

use crate::error::LeaseError;
use crate::models::IpFamily;

/// Parse an IP literal and report its family. Purely syntactic.
pub fn classify(ip: &str) -> Result<(IpAddr, IpFamily), LeaseError> {
    let addr: IpAddr = ip
        .trim()
        .parse()
        .map_err(|_| LeaseError::MalformedEvent(format!("invalid IP address: {}", ip)))?;
    Ok((addr, IpFamily::of(&addr)))
}

/// Parse the family label asserted by the reporter
pub fn asserted_family(label: &str) -> Result<IpFamily, LeaseError> {
    IpFamily::from_label(label)
        .ok_or_else(|| LeaseError::MalformedEvent(format!("invalid address family: {}", label)))
}

/// Check an asserted family against the family that is authoritative
/// (the resolved subnet's). Mismatch reports the expected family.
pub fn confirm_family(asserted: IpFamily, expected: IpFamily) -> Result<IpFamily, LeaseError> {
    if asserted == expected {
        Ok(expected)
    } else {
        Err(LeaseError::FamilyMismatch { expected, asserted })
    }
}
