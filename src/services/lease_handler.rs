use crate::error::LeaseError;
use crate::models::LeaseEvent;

use super::lease_processor::{LeaseOutcome, LeaseProcessor};

/// What the ingest loop should do with a delivered event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Applied, or a recognized no-op
    Applied,
    /// Rejected on its content; retrying cannot help
    Rejected,
    /// The backend failed; deliver the same event again later
    Retry,
}

/// Handle a lease event delivered by the spool watcher and log the result.
/// Callers await this in delivery order so events for one MAC apply in that
/// order, and stop delivering after a `Retry`.
pub async fn on_lease_event(processor: &LeaseProcessor, event: &LeaseEvent) -> Delivery {
    match processor.submit_lease_event(event).await {
        Ok(LeaseOutcome::Committed { records, .. }) => {
            tracing::debug!("Lease commit for {} recorded on {} record(s)", event.mac, records.len());
            Delivery::Applied
        }
        Ok(LeaseOutcome::Cleared { records, .. }) => {
            tracing::debug!("Lease {} for {} cleared {} record(s)", event.action, event.mac, records.len());
            Delivery::Applied
        }
        Ok(outcome) => {
            tracing::debug!("Lease {} for {} ignored: {:?}", event.action, event.mac, outcome);
            Delivery::Applied
        }
        Err(LeaseError::Backend(e)) => {
            tracing::warn!(
                "Lease {} for {} ({}) from {} not stored, will retry: {:#}",
                event.action,
                event.mac,
                event.ip,
                event.origin_id,
                e
            );
            Delivery::Retry
        }
        Err(e) => {
            tracing::warn!(
                kind = e.kind(),
                "Rejected lease {} for {} ({}) from {}: {}",
                event.action,
                event.mac,
                event.ip,
                event.origin_id,
                e
            );
            Delivery::Rejected
        }
    }
}
