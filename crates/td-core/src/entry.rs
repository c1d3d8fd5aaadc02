//! Calendar entries and ticket detail fetched from the scheduling system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntryId, TicketId};

/// Schedule entry type codes used by the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Dispatched service work (`S`).
    Schedule,
    /// Paid time off (`V`).
    Pto,
    /// Company holiday (`H`).
    Holiday,
    /// A synced Outlook meeting (`C`). Never blocks dispatch.
    Meeting,
    /// Any other code the remote system emits; blocks time generically.
    Other(String),
}

impl EntryType {
    /// Maps a remote type code onto the known variants.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "S" => Self::Schedule,
            "V" => Self::Pto,
            "H" => Self::Holiday,
            "C" => Self::Meeting,
            other => Self::Other(other.to_string()),
        }
    }

    /// The remote type code for this variant.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Schedule => "S",
            Self::Pto => "V",
            Self::Holiday => "H",
            Self::Meeting => "C",
            Self::Other(code) => code,
        }
    }

    /// Whether this entry type marks an absence (PTO or holiday).
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::Pto | Self::Holiday)
    }
}

/// A schedule entry on the member's calendar.
///
/// Start and end are absolute instants; whether they carry a meaningful
/// time of day (versus marking whole days) is decided during aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    /// Remote entry id. Absent on some synthetic entries.
    pub id: Option<EntryId>,
    pub entry_type: EntryType,
    /// The ticket this entry schedules, for `Schedule` entries.
    pub ticket: Option<TicketId>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Allocated hours across the whole (possibly multi-day) span.
    pub hours: f64,
}

/// Ticket fields needed to compute dispatchable hours.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDetail {
    pub id: TicketId,
    /// Status name as reported by the service board.
    pub status: String,
    pub budget_hours: f64,
    /// Hours already worked. The wire format may omit this; absent means 0.
    pub actual_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_code_roundtrip() {
        for code in ["S", "V", "H", "C"] {
            assert_eq!(EntryType::from_code(code).code(), code);
        }
        let other = EntryType::from_code("M");
        assert_eq!(other, EntryType::Other("M".to_string()));
        assert_eq!(other.code(), "M");
    }

    #[test]
    fn absence_covers_pto_and_holiday_only() {
        assert!(EntryType::Pto.is_absence());
        assert!(EntryType::Holiday.is_absence());
        assert!(!EntryType::Schedule.is_absence());
        assert!(!EntryType::Meeting.is_absence());
        assert!(!EntryType::Other("M".to_string()).is_absence());
    }
}
