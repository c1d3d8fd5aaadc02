//! Run configuration.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::DispatchError;
use crate::policy::{ActivityPolicy, DuplicatePolicy};
use crate::types::{MemberId, TicketId};

const fn default_daily_cap() -> f64 {
    8.0
}

const fn default_day_start_hour() -> u32 {
    9
}

const fn unbounded() -> f64 {
    f64::INFINITY
}

/// A ticket queued for dispatch.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketRequest {
    pub id: TicketId,
    /// Overrides the resolved remaining hours. Forces dispatch even when
    /// the activity policy judges the ticket inactive.
    #[serde(default)]
    pub hours: Option<f64>,
}

/// Everything a dispatch run needs to know. Immutable for the run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchParams {
    /// Member whose calendar receives the hours.
    pub member: MemberId,
    /// First day eligible for dispatch (inclusive).
    pub start_date: NaiveDate,
    /// Last day eligible for dispatch (inclusive, end of local day).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Timezone all day boundaries and slot labels are computed in.
    pub timezone: Tz,
    /// Maximum hours dispatched to a single day.
    #[serde(default = "default_daily_cap")]
    pub daily_cap: f64,
    /// Maximum hours dispatched across the whole run.
    #[serde(default = "unbounded")]
    pub total_cap: f64,
    /// Local hour the working day starts at.
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    /// Which tickets count as active.
    #[serde(default)]
    pub activity: ActivityPolicy,
    /// What to do with tickets that already have calendar hours.
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
    /// Move each ticket to "Assigned" after a successful dispatch.
    #[serde(default)]
    pub assign_on_dispatch: bool,
    /// Plan and trace without writing to the remote calendar.
    #[serde(default)]
    pub dry_run: bool,
    /// Tickets to dispatch, in order.
    pub tickets: Vec<TicketRequest>,
}

impl DispatchParams {
    /// Rejects configurations no run should start with.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if !(self.daily_cap.is_finite() && self.daily_cap > 0.0) {
            return Err(DispatchError::Config(format!(
                "daily cap must be a positive number of hours, got {}",
                self.daily_cap
            )));
        }
        if self.total_cap.is_nan() || self.total_cap <= 0.0 {
            return Err(DispatchError::Config(format!(
                "total cap must be positive, got {}",
                self.total_cap
            )));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(DispatchError::Config(format!(
                    "end date {end} precedes start date {}",
                    self.start_date
                )));
            }
        }
        for ticket in &self.tickets {
            if let Some(hours) = ticket.hours {
                if !(hours.is_finite() && hours > 0.0) {
                    return Err(DispatchError::Config(format!(
                        "hour override for ticket {} must be positive, got {hours}",
                        ticket.id
                    )));
                }
            }
        }
        self.day_start().map(|_| ())
    }

    /// Local wall-clock time the working day starts at.
    pub fn day_start(&self) -> Result<NaiveTime, DispatchError> {
        NaiveTime::from_hms_opt(self.day_start_hour, 0, 0).ok_or_else(|| {
            DispatchError::Config(format!(
                "start-of-day hour must be 0..=23, got {}",
                self.day_start_hour
            ))
        })
    }
}
