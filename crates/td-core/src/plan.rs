//! Dispatch planning.
//!
//! The planner owns the occupancy model and the day cursor for the whole
//! run. Tickets are planned strictly in the configured order; every
//! committed slot is written back into the model before the next search,
//! so later tickets see earlier allocations. Emitting the resulting
//! records against the remote calendar is the caller's job.

use std::collections::HashMap;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::cursor::DayCursor;
use crate::error::DispatchError;
use crate::occupancy::OccupancyModel;
use crate::params::{DispatchParams, TicketRequest};
use crate::policy::DuplicatePolicy;
use crate::slot::find_slot;
use crate::types::TicketId;

/// Hours at or below this count as fully dispatched. A tolerance against
/// floating rounding, not a true zero test.
const EPSILON_HOURS: f64 = 0.01;

/// One committed allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub ticket: TicketId,
    /// Local start instant in the run timezone.
    pub start: DateTime<Tz>,
    pub hours: f64,
    /// True when the run is a dry run and nothing will be written.
    pub simulated: bool,
}

/// All allocations planned for one ticket, in commit order.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketPlan {
    pub ticket: TicketId,
    pub records: Vec<DispatchRecord>,
}

/// Plans allocations for a run's tickets.
pub struct Planner<'a> {
    params: &'a DispatchParams,
    model: OccupancyModel,
    cursor: DayCursor,
    /// Hours still available under the run's total cap.
    budget: f64,
}

impl<'a> Planner<'a> {
    /// Takes ownership of the aggregated occupancy model and positions the
    /// cursor on the first usable day.
    pub fn new(params: &'a DispatchParams, model: OccupancyModel) -> Result<Self, DispatchError> {
        params.validate()?;
        let cursor = DayCursor::new(
            params.start_date,
            params.timezone,
            params.day_start()?,
            params.daily_cap,
            &model,
        );
        Ok(Self {
            params,
            model,
            cursor,
            budget: params.total_cap,
        })
    }

    /// Plans every configured ticket, in order.
    #[must_use]
    pub fn plan(&mut self, resolved: &HashMap<TicketId, f64>) -> Vec<TicketPlan> {
        let requests = self.params.tickets.clone();
        requests
            .iter()
            .map(|request| TicketPlan {
                ticket: request.id.clone(),
                records: self.plan_ticket(request, resolved),
            })
            .collect()
    }

    /// Plans one ticket's allocations and commits them into the model.
    pub fn plan_ticket(
        &mut self,
        request: &TicketRequest,
        resolved: &HashMap<TicketId, f64>,
    ) -> Vec<DispatchRecord> {
        let wanted = request
            .hours
            .or_else(|| resolved.get(&request.id).copied())
            .unwrap_or(0.0);
        let mut remaining = wanted.min(self.budget);
        remaining = self.apply_duplicate_policy(&request.id, remaining);

        let mut records = Vec::new();
        while remaining > EPSILON_HOURS && self.budget > EPSILON_HOURS && self.within_end_bound() {
            let today = self.cursor.date();
            let next_hours = remaining.min(self.params.daily_cap - self.model.hours_on(today));

            let Some(slot) = find_slot(
                &self.model,
                self.cursor.current(),
                self.params.daily_cap,
                next_hours,
                remaining,
            ) else {
                // Not enough contiguous time today; skip the day outright.
                self.cursor.advance(true, &self.model);
                continue;
            };

            tracing::debug!(
                ticket = %request.id,
                start = %slot.start.format("%Y-%m-%d %H:%M"),
                hours = slot.hours,
                "committing slot"
            );
            self.model.commit(&request.id, slot.start, slot.hours);
            self.cursor.advance(false, &self.model);
            remaining -= slot.hours;
            self.budget -= slot.hours;
            records.push(DispatchRecord {
                ticket: request.id.clone(),
                start: slot.start,
                hours: slot.hours,
                simulated: self.params.dry_run,
            });
        }
        records
    }

    fn apply_duplicate_policy(&self, ticket: &TicketId, remaining: f64) -> f64 {
        let existing = self.model.ticket_hours(ticket);
        match self.params.duplicates {
            DuplicatePolicy::Ignore => remaining,
            DuplicatePolicy::Skip if existing > 0.0 => {
                tracing::info!(%ticket, existing, "hours already on calendar, skipping");
                0.0
            }
            DuplicatePolicy::Skip => remaining,
            DuplicatePolicy::Subtract => remaining - existing,
        }
    }

    fn within_end_bound(&self) -> bool {
        self.params
            .end_date
            .is_none_or(|end| self.cursor.date() <= end)
    }

    /// The occupancy model including everything planned so far.
    #[must_use]
    pub const fn model(&self) -> &OccupancyModel {
        &self.model
    }

    /// Hours still available under the total cap.
    #[must_use]
    pub const fn remaining_budget(&self) -> f64 {
        self.budget
    }
}
