//! Tickets command: show resolved remaining hours for a run's tickets.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use td_api::TicketStore;
use td_core::{DispatchParams, TicketDetail, TicketId, resolve_remaining};

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, params_path: &Path) -> Result<()> {
    let params = super::load_params(params_path)?;
    let client = super::client(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;

    let ids: Vec<TicketId> = params.tickets.iter().map(|t| t.id.clone()).collect();
    let details = runtime
        .block_on(async { TicketStore::new(&client).fetch(&ids).await })
        .context("failed to fetch ticket detail")?;

    write!(writer, "{}", format_tickets(&params, &details))?;
    Ok(())
}

/// Renders one line per configured ticket, in the run's order.
fn format_tickets(params: &DispatchParams, details: &[TicketDetail]) -> String {
    let resolved = resolve_remaining(details, &params.activity);
    let by_id: HashMap<&TicketId, &TicketDetail> =
        details.iter().map(|detail| (&detail.id, detail)).collect();

    let mut out = String::new();
    for request in &params.tickets {
        let Some(detail) = by_id.get(&request.id) else {
            let _ = writeln!(out, "{}  not found", request.id);
            continue;
        };
        let remaining = resolved.get(&request.id).copied().unwrap_or(0.0);
        let _ = write!(
            out,
            "{}  {}  budget {:.2}h  actual {:.2}h  remaining {:.2}h",
            detail.id, detail.status, detail.budget_hours, detail.actual_hours, remaining
        );
        if let Some(hours) = request.hours {
            let _ = write!(out, "  (override {hours:.2}h)");
        }
        out.push('\n');
    }
    out
}
