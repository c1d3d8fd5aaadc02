//! Calendar command: show day-by-day load for a member.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use td_core::{MemberId, OccupancyModel};

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    member: &str,
    from: NaiveDate,
    timezone: Tz,
) -> Result<()> {
    let member = MemberId::new(member)?;
    let client = super::client(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;

    let entries = runtime
        .block_on(client.schedule_entries(&member, from))
        .context("failed to fetch schedule entries")?;
    let model = OccupancyModel::from_entries(&entries, timezone)?;

    write!(writer, "{}", format_occupancy(&model))?;
    Ok(())
}

/// Renders the occupancy model, one line per day with any commitments.
fn format_occupancy(model: &OccupancyModel) -> String {
    if model.is_empty() {
        return "calendar is clear\n".to_string();
    }

    let mut out = String::new();
    for (date, bucket) in model.days() {
        let mut line = format!("{date}  {:5.2}h", bucket.hours);

        if let (Some(first), Some(last)) = (
            bucket.slots.first_key_value(),
            bucket.slots.last_key_value(),
        ) {
            let _ = write!(line, "  {}..{}", first.0, last.0);
        }

        let mut tickets: Vec<&str> = bucket.tickets.iter().map(td_core::TicketId::as_str).collect();
        tickets.dedup();
        if !tickets.is_empty() {
            let _ = write!(line, "  tickets {}", tickets.join(", "));
        }

        out.push_str(&line);
        out.push('\n');
    }
    out
}
