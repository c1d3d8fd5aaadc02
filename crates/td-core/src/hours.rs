//! Remaining-hours resolution.

use std::collections::HashMap;

use crate::entry::TicketDetail;
use crate::policy::ActivityPolicy;
use crate::types::TicketId;

/// Rounds hours to the nearest quarter hour.
#[must_use]
pub fn round_quarter(hours: f64) -> f64 {
    (hours * 4.0).round() / 4.0
}

/// Computes dispatchable remaining hours for each ticket.
///
/// Remaining hours are budget minus actual, rounded to the nearest quarter
/// hour. Tickets the activity policy judges inactive resolve to zero; an
/// explicit per-ticket override applied by the planner forces dispatch
/// regardless.
#[must_use]
pub fn resolve_remaining(
    details: &[TicketDetail],
    policy: &ActivityPolicy,
) -> HashMap<TicketId, f64> {
    details
        .iter()
        .map(|ticket| {
            let hours = if policy.is_active(&ticket.status) {
                round_quarter(ticket.budget_hours - ticket.actual_hours)
            } else {
                tracing::debug!(
                    ticket = %ticket.id,
                    status = %ticket.status,
                    "ticket inactive, resolving to zero hours"
                );
                0.0
            };
            (ticket.id.clone(), hours)
        })
        .collect()
}
