//! Core calendar allocation engine for the ticket dispatcher.
//!
//! This crate contains the run's state and logic, free of any I/O:
//! - Occupancy: rebuilding a per-day, quarter-hour occupancy model from
//!   fetched calendar entries
//! - Cursor: walking forward through dispatchable days
//! - Slot search: finding usable contiguous free time within a day
//! - Hours: resolving each ticket's dispatchable remaining hours
//! - Planning: allocating hours across days under the configured caps and
//!   policies
//!
//! Fetching entries and emitting the planned allocations against the
//! remote scheduling system live in `td-api` and the CLI.

pub mod cursor;
pub mod entry;
pub mod error;
pub mod hours;
pub mod occupancy;
pub mod params;
pub mod plan;
pub mod policy;
pub mod slot;
pub mod types;

pub use cursor::DayCursor;
pub use entry::{CalendarEntry, EntryType, TicketDetail};
pub use error::DispatchError;
pub use hours::{resolve_remaining, round_quarter};
pub use occupancy::{DayBucket, DayEntry, OccupancyModel, SlotOccupant};
pub use params::{DispatchParams, TicketRequest};
pub use plan::{DispatchRecord, Planner, TicketPlan};
pub use policy::{ActivityPolicy, DuplicatePolicy};
pub use slot::{Slot, find_slot};
pub use types::{EntryId, IdError, MemberId, TicketId};
