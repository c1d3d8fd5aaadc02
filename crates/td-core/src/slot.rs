//! Contiguous free-slot search within a single day.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::occupancy::{OccupancyModel, SLOT_MINUTES, SLOTS_PER_HOUR};

/// A dispatchable span of free time.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Local start instant of the span.
    pub start: DateTime<Tz>,
    /// Usable hours, never more than what was asked for.
    pub hours: f64,
}

/// Minimum contiguous run, in quarter-hour slots, acceptable for a ticket
/// still needing `remaining` hours. Tasks of an hour or more are not
/// fragmented below one hour; smaller tasks only need their own length.
fn min_contiguous_slots(remaining: f64) -> f64 {
    if remaining >= 1.0 {
        SLOTS_PER_HOUR
    } else {
        remaining * SLOTS_PER_HOUR
    }
}

/// Searches the cursor's day for the first sufficient free run.
///
/// Scans forward from the cursor in quarter-hour steps, at most
/// `daily_cap * 4` of them. A run shorter than the contiguity threshold is
/// abandoned when an occupied slot breaks it; once a run meets the
/// threshold the first occupied slot ends the search (greedy: no hunting
/// for a larger run later in the day). `None` means the day cannot host an
/// acceptable run and the cursor should be forced to the next day.
#[must_use]
pub fn find_slot(
    model: &OccupancyModel,
    cursor: DateTime<Tz>,
    daily_cap: f64,
    target_hours: f64,
    remaining: f64,
) -> Option<Slot> {
    let Some(bucket) = model.day(cursor.date_naive()) else {
        // Untouched day: everything from the cursor onward is free.
        return Some(Slot {
            start: cursor,
            hours: target_hours,
        });
    };

    let threshold = min_contiguous_slots(remaining);
    let mut run = 0u32;
    let mut run_start = cursor;
    let mut at = cursor;
    let steps = (daily_cap * SLOTS_PER_HOUR).ceil() as u32;

    for _ in 0..steps {
        let used = bucket.is_occupied(at.time());
        if used && f64::from(run) >= threshold {
            break;
        } else if used {
            // Hold out for a longer stretch.
            run = 0;
        } else {
            if run == 0 {
                run_start = at;
            }
            run += 1;
        }
        at += Duration::minutes(SLOT_MINUTES);
    }

    if f64::from(run) >= threshold {
        Some(Slot {
            start: run_start,
            hours: (f64::from(run) / SLOTS_PER_HOUR).min(target_hours),
        })
    } else {
        None
    }
}
