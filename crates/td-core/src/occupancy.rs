//! Per-day occupancy built from the member's existing calendar.
//!
//! Each day is tracked two ways: a running total of committed hours, and a
//! map of quarter-hour slots (`HH:MM` labels, 96 per day) to whoever holds
//! them. The totals drive the daily-cap checks; the slot map drives the
//! contiguous-free-run search. Buckets are created lazily, live for one
//! run, and are never persisted.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::entry::{CalendarEntry, EntryType};
use crate::error::DispatchError;
use crate::types::{EntryId, TicketId};

/// Slot granularity.
pub const SLOT_MINUTES: i64 = 15;
/// Quarter-hour slots per hour.
pub const SLOTS_PER_HOUR: f64 = 4.0;

/// Hours stamped on a day fully blocked by PTO or a holiday. Chosen to
/// exceed any plausible daily cap, so dispatch can never land there even
/// though it overstates the literal hours.
const FULL_DAY_BLOCK_HOURS: f64 = 12.0;
/// Per-day absence share at which a day counts as fully blocked.
const FULL_DAY_THRESHOLD_HOURS: f64 = 8.0;

/// Who holds a quarter-hour slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOccupant {
    /// An entry fetched from the remote calendar.
    Entry(EntryId),
    /// A fetched entry that carried no id.
    Foreign,
    /// Committed by this run; no remote id yet.
    Planned,
}

/// One calendar entry's share of a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayEntry {
    pub entry_type: EntryType,
    pub ticket: Option<TicketId>,
    /// Hours attributed to this day, after multi-day splitting.
    pub hours: f64,
}

/// One day's committed hours and slot map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBucket {
    /// Total committed hours for the day.
    pub hours: f64,
    /// Occupied quarter-hour slots, keyed by local `HH:MM` label.
    pub slots: BTreeMap<String, SlotOccupant>,
    /// Tickets with scheduled work on this day.
    pub tickets: Vec<TicketId>,
    /// Per-day shares of the entries touching this day.
    pub entries: Vec<DayEntry>,
}

impl DayBucket {
    /// Whether the quarter-hour slot starting at `at` is taken.
    #[must_use]
    pub fn is_occupied(&self, at: NaiveTime) -> bool {
        self.slots.contains_key(&slot_label(at))
    }

    fn stamp(&mut self, from: NaiveTime, hours: f64, occupant: &SlotOccupant) {
        let mut at = from;
        for _ in 0..slot_count(hours) {
            self.slots.insert(slot_label(at), occupant.clone());
            at += Duration::minutes(SLOT_MINUTES);
        }
    }
}

/// Day-by-day occupancy for one member, local to the run timezone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyModel {
    days: BTreeMap<NaiveDate, DayBucket>,
}

impl OccupancyModel {
    /// Builds the model from fetched calendar entries.
    ///
    /// Fails fast on malformed entries; a partially built model is unsafe
    /// to dispatch against.
    pub fn from_entries(entries: &[CalendarEntry], timezone: Tz) -> Result<Self, DispatchError> {
        let mut model = Self::default();
        for entry in entries {
            model.absorb(entry, timezone)?;
        }
        Ok(model)
    }

    fn absorb(&mut self, entry: &CalendarEntry, timezone: Tz) -> Result<(), DispatchError> {
        if entry.entry_type == EntryType::Meeting {
            // Synced Outlook meetings neither block nor count.
            tracing::debug!(entry = %entry_label(entry), "skipping outlook entry");
            return Ok(());
        }
        if !entry.hours.is_finite() || entry.hours < 0.0 {
            return Err(DispatchError::MalformedEntry {
                entry: entry_label(entry),
                problem: "hours must be a non-negative number",
            });
        }
        if entry.end < entry.start {
            return Err(DispatchError::MalformedEntry {
                entry: entry_label(entry),
                problem: "end precedes start",
            });
        }

        let (start, end) = localize_span(entry.start, entry.end, timezone);
        let days = span_days(start, end);
        let hours = per_day_hours(entry, days);
        let occupant = entry
            .id
            .clone()
            .map_or(SlotOccupant::Foreign, SlotOccupant::Entry);

        for offset in 0..days {
            let day_start = start + Duration::days(i64::from(offset));
            let bucket = self.days.entry(day_start.date()).or_default();
            bucket.hours += hours;
            if entry.entry_type == EntryType::Schedule {
                if let Some(ticket) = &entry.ticket {
                    bucket.tickets.push(ticket.clone());
                }
            }
            bucket.entries.push(DayEntry {
                entry_type: entry.entry_type.clone(),
                ticket: entry.ticket.clone(),
                hours,
            });
            bucket.stamp(day_start.time(), hours, &occupant);
        }
        Ok(())
    }

    /// Records an allocation made by this run, so later tickets see it.
    pub fn commit(&mut self, ticket: &TicketId, start: DateTime<Tz>, hours: f64) {
        let local = start.naive_local();
        let bucket = self.days.entry(local.date()).or_default();
        bucket.hours += hours;
        bucket.tickets.push(ticket.clone());
        bucket.entries.push(DayEntry {
            entry_type: EntryType::Schedule,
            ticket: Some(ticket.clone()),
            hours,
        });
        bucket.stamp(local.time(), hours, &SlotOccupant::Planned);
    }

    /// The bucket for a day, if anything occupies it.
    #[must_use]
    pub fn day(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.days.get(&date)
    }

    /// Committed hours on a day; zero for untouched days.
    #[must_use]
    pub fn hours_on(&self, date: NaiveDate) -> f64 {
        self.days.get(&date).map_or(0.0, |bucket| bucket.hours)
    }

    /// Hours already committed to a ticket across the whole window.
    #[must_use]
    pub fn ticket_hours(&self, ticket: &TicketId) -> f64 {
        self.days
            .values()
            .flat_map(|bucket| &bucket.entries)
            .filter(|entry| entry.ticket.as_ref() == Some(ticket))
            .map(|entry| entry.hours)
            .sum()
    }

    /// Days with any occupancy, in date order.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &DayBucket)> {
        self.days.iter().map(|(date, bucket)| (*date, bucket))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

fn slot_label(at: NaiveTime) -> String {
    at.format("%H:%M").to_string()
}

fn slot_count(hours: f64) -> usize {
    // A fractional tail still occupies a whole slot.
    let slots = (hours * SLOTS_PER_HOUR).ceil();
    if slots.is_sign_negative() { 0 } else { slots as usize }
}

fn entry_label(entry: &CalendarEntry) -> String {
    entry
        .id
        .as_ref()
        .map_or_else(|| "?".to_string(), ToString::to_string)
}

/// Splits an entry's span into local wall-clock endpoints.
///
/// Spans whose recorded instants are both exactly midnight UTC are all-day
/// markers: they keep their recorded dates instead of being shifted into
/// the run timezone.
fn localize_span(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: Tz,
) -> (NaiveDateTime, NaiveDateTime) {
    let all_day = is_midnight(start) && is_midnight(end);
    if all_day {
        (start.naive_utc(), end.naive_utc())
    } else {
        (
            start.with_timezone(&timezone).naive_local(),
            end.with_timezone(&timezone).naive_local(),
        )
    }
}

fn is_midnight(at: DateTime<Utc>) -> bool {
    at.time().num_seconds_from_midnight() == 0
}

/// Inclusive count of days the span touches. Rounds down, so a span under
/// 24 hours is one day regardless of how many dates it crosses.
fn span_days(start: NaiveDateTime, end: NaiveDateTime) -> u32 {
    let whole = (end - start).num_days().max(0);
    u32::try_from(whole).unwrap_or(u32::MAX).saturating_add(1)
}

fn per_day_hours(entry: &CalendarEntry, days: u32) -> f64 {
    let share = entry.hours / f64::from(days);
    if entry.entry_type.is_absence() && share >= FULL_DAY_THRESHOLD_HOURS {
        FULL_DAY_BLOCK_HOURS
    } else {
        share
    }
}
