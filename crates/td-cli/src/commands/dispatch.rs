//! Dispatch command: fetch the calendar, plan allocations, emit actions.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use td_api::{Client, NewScheduleEntry, TicketStore};
use td_core::{
    DispatchParams, OccupancyModel, Planner, TicketId, TicketPlan, resolve_remaining,
};

use crate::Config;

/// Status applied when `assign_on_dispatch` is set.
const ASSIGNED_STATUS: &str = "Assigned";

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    params_path: &Path,
    force_dry_run: bool,
) -> Result<()> {
    let mut params = super::load_params(params_path)?;
    if force_dry_run {
        params.dry_run = true;
    }

    let client = super::client(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime.block_on(dispatch(writer, &client, &params))
}

async fn dispatch<W: Write>(
    writer: &mut W,
    client: &Client,
    params: &DispatchParams,
) -> Result<()> {
    let entries = client
        .schedule_entries(&params.member, params.start_date)
        .await
        .context("failed to fetch schedule entries")?;
    tracing::debug!(count = entries.len(), "fetched schedule entries");
    let model = OccupancyModel::from_entries(&entries, params.timezone)?;

    let ids: Vec<TicketId> = params.tickets.iter().map(|t| t.id.clone()).collect();
    let mut store = TicketStore::new(client);
    let details = store
        .fetch(&ids)
        .await
        .context("failed to fetch ticket detail")?;
    let resolved = resolve_remaining(&details, &params.activity);

    // All model and cursor bookkeeping happens here, before anything is
    // written remotely.
    let mut planner = Planner::new(params, model)?;
    let plans = planner.plan(&resolved);

    if params.dry_run {
        trace_plans(writer, &plans)?;
        return Ok(());
    }

    let mut actions = 0usize;
    let mut failures = 0usize;
    for plan in &plans {
        let (emitted, failed) = emit(writer, client, params, plan).await?;
        actions += emitted;
        failures += failed;
    }

    writeln!(writer, "{actions} actions, {failures} failed")?;
    if failures > 0 {
        bail!("{failures} of {actions} dispatch actions failed");
    }
    Ok(())
}

/// Emits one ticket's planned allocations.
///
/// Create calls run concurrently and fail independently; each outcome is
/// reported on its own line. When `assign_on_dispatch` is set and at least
/// one create succeeded, a single best-effort status update follows.
/// Returns `(actions, failures)`.
async fn emit<W: Write>(
    writer: &mut W,
    client: &Client,
    params: &DispatchParams,
    plan: &TicketPlan,
) -> Result<(usize, usize)> {
    if plan.records.is_empty() {
        writeln!(writer, "ticket {}: nothing to dispatch", plan.ticket)?;
        return Ok((0, 0));
    }

    let results = join_all(plan.records.iter().map(|record| {
        let entry = NewScheduleEntry::from_record(record, &params.member);
        async move { client.create_entry(&entry).await }
    }))
    .await;

    let mut actions = 0usize;
    let mut failures = 0usize;
    let mut any_created = false;
    for (record, result) in plan.records.iter().zip(results) {
        actions += 1;
        let when = record.start.format("%Y-%m-%d %H:%M");
        match result {
            Ok(()) => {
                any_created = true;
                writeln!(
                    writer,
                    "DISPATCHED {when} ticket {} {:.2}h",
                    record.ticket, record.hours
                )?;
            }
            Err(err) => {
                failures += 1;
                tracing::error!(ticket = %plan.ticket, error = %err, "create entry failed");
                writeln!(
                    writer,
                    "FAILED {when} ticket {} {:.2}h: {err}",
                    record.ticket, record.hours
                )?;
            }
        }
    }

    if params.assign_on_dispatch && any_created {
        actions += 1;
        match client.update_ticket_status(&plan.ticket, ASSIGNED_STATUS).await {
            Ok(()) => writeln!(writer, "ASSIGNED ticket {}", plan.ticket)?,
            Err(err) => {
                failures += 1;
                tracing::error!(ticket = %plan.ticket, error = %err, "status update failed");
                writeln!(writer, "FAILED assign ticket {}: {err}", plan.ticket)?;
            }
        }
    }

    Ok((actions, failures))
}

/// Writes the dry-run trace, one line per committed slot.
fn trace_plans<W: Write>(writer: &mut W, plans: &[TicketPlan]) -> Result<()> {
    for plan in plans {
        if plan.records.is_empty() {
            writeln!(writer, "ticket {}: nothing to dispatch", plan.ticket)?;
            continue;
        }
        for record in &plan.records {
            writeln!(
                writer,
                "DISPATCH {} ticket {} {:.2}h (dry-run)",
                record.start.format("%Y-%m-%d %H:%M"),
                record.ticket,
                record.hours
            )?;
        }
    }
    Ok(())
}
