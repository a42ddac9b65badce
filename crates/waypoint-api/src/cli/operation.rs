//! Operation control commands: start, pause, resume, cancel, status, list.
//!
//! The worker pool lives in this process, so commands that submit work
//! (`start`, `resume`) stay in the foreground until the operation pauses,
//! completes or stops on a failed step. Ctrl+C requests a pause and waits
//! for the next checkpoint.

use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use waypoint_core::fold::{TallySpec, start_parsing};
use waypoint_core::operation::steps::completion;
use waypoint_core::stream::{read_finish_continue, read_start};
use waypoint_types::chain::{Chain, StepSignature};
use waypoint_types::operation::{ControlOutcome, Operation, OperationId, OperationStatus};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// `add(1, 2) | mult(4) | completion`, invoked with a null input.
pub async fn start_arith(state: &AppState, requester: &str, json: bool) -> Result<()> {
    let id = state
        .service()
        .start(
            requester,
            |id| {
                Chain::default()
                    .then(StepSignature::new("add").arg(1).arg(2))
                    .then(StepSignature::new("mult").arg(4))
                    .then(completion(id))
            },
            serde_json::Value::Null,
        )
        .await
        .context("failed to start arith operation")?;

    announce_start(id, "arith", json);
    run_until_settled(state, id, json).await
}

/// Stream `file` and tally `count_by` per `group_by`.
pub async fn start_tally(
    state: &AppState,
    requester: &str,
    file: &Path,
    group_by: String,
    count_by: String,
    json: bool,
) -> Result<()> {
    let source = tokio::fs::canonicalize(file)
        .await
        .with_context(|| format!("cannot open {}", file.display()))?
        .display()
        .to_string();
    let spec = TallySpec::new(group_by, count_by);

    let id = state
        .service()
        .start(
            requester,
            |id| {
                Chain::default()
                    .then(read_start(&source))
                    .then(read_finish_continue(&start_parsing(id, &spec), &source, id))
            },
            serde_json::Value::Null,
        )
        .await
        .context("failed to start tally operation")?;

    announce_start(id, "tally", json);
    run_until_settled(state, id, json).await
}

fn announce_start(id: OperationId, kind: &str, json: bool) {
    if json {
        return;
    }
    println!();
    println!(
        "  {} Started {} operation {}",
        style("*").green().bold(),
        kind,
        style(id.encode()).cyan()
    );
    println!("  {}", style("Press Ctrl+C to pause at the next checkpoint").dim());
}

/// Wait until no chain is running, pausing the operation on Ctrl+C.
async fn run_until_settled(state: &AppState, id: OperationId, json: bool) -> Result<()> {
    tokio::select! {
        _ = state.engine.wait_idle() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            let outcome = state.service().pause(&id.encode()).await?;
            if !json {
                if outcome.success {
                    println!("\n  Pausing at the next checkpoint...");
                } else {
                    println!("\n  Could not pause: {}", outcome.message.unwrap_or_default());
                }
            }
            state.engine.wait_idle().await;
        }
    }

    let operation = fetch(state, id).await?;
    if operation.status == OperationStatus::InProgress {
        tracing::warn!(
            operation_id = %id,
            "no chain is running for an in-progress operation; a step failed"
        );
    }
    print_operation(&operation, json)
}

// ---------------------------------------------------------------------------
// Pause / Resume / Cancel
// ---------------------------------------------------------------------------

pub async fn pause(state: &AppState, encoded: &str, json: bool) -> Result<()> {
    let outcome = state.service().pause(encoded).await?;
    print_outcome(&outcome, "Pause requested for", json)
}

pub async fn resume(state: &AppState, encoded: &str, json: bool) -> Result<()> {
    let outcome = state.service().resume(encoded).await?;
    print_outcome(&outcome, "Resumed", json)?;
    let id = OperationId::decode(encoded)?;
    run_until_settled(state, id, json).await
}

pub async fn cancel(state: &AppState, encoded: &str, json: bool) -> Result<()> {
    let outcome = state.service().cancel(encoded).await?;
    print_outcome(&outcome, "Cancelled", json)
}

fn print_outcome(outcome: &ControlOutcome, verb: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    }
    if !outcome.success {
        bail!(
            "{}: {}",
            outcome.operation_id,
            outcome.message.as_deref().unwrap_or("request rejected")
        );
    }
    if !json {
        println!();
        println!(
            "  {} {} {}",
            style("*").green().bold(),
            verb,
            style(&outcome.operation_id).cyan()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Status / List
// ---------------------------------------------------------------------------

pub async fn status(state: &AppState, encoded: &str, json: bool) -> Result<()> {
    let id = OperationId::decode(encoded)?;
    let operation = fetch(state, id).await?;
    print_operation(&operation, json)
}

pub async fn list(state: &AppState, requester: Option<&str>, json: bool) -> Result<()> {
    let operations = state.service().list(requester).await?;

    if json {
        let out: Vec<_> = operations.iter().map(operation_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!();
        println!("  No operations yet.");
        println!("  Start one with: {}", style("wpt start arith").dim());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Requester"),
            Cell::new("Status"),
            Cell::new("Updated"),
        ]);

    for op in &operations {
        table.add_row(vec![
            Cell::new(op.id.encode()),
            Cell::new(&op.requester),
            Cell::new(op.status.as_str()).fg(status_color(op.status)),
            Cell::new(op.updated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

async fn fetch(state: &AppState, id: OperationId) -> Result<Operation> {
    match state.service().get(id).await? {
        Some(operation) => Ok(operation),
        None => bail!("operation {} not found", id.encode()),
    }
}

fn status_color(status: OperationStatus) -> Color {
    match status {
        OperationStatus::InProgress => Color::Blue,
        OperationStatus::RequestingPause => Color::Yellow,
        OperationStatus::Paused => Color::Magenta,
        OperationStatus::Completed => Color::Green,
        OperationStatus::Cancelled => Color::DarkGrey,
    }
}

fn operation_json(op: &Operation) -> serde_json::Value {
    serde_json::json!({
        "id": op.id.encode(),
        "requester": op.requester,
        "status": op.status.as_str(),
        "result": op.result,
        "pending_workflow_location": op.pending_workflow_location,
        "pending_result_location": op.pending_result_location,
        "created_at": op.created_at.to_rfc3339(),
        "updated_at": op.updated_at.to_rfc3339(),
    })
}

fn print_operation(op: &Operation, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&operation_json(op))?);
        return Ok(());
    }

    println!();
    println!(
        "  Operation {}  {}",
        style(op.id.encode()).cyan().bold(),
        style(op.status.as_str()).bold()
    );
    println!("  Requester: {}", op.requester);
    println!("  Updated:   {}", op.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(location) = &op.pending_workflow_location {
        println!("  Workflow:  {location}");
    }
    if let Some(location) = &op.pending_result_location {
        println!("  Result at: {location}");
    }
    if let Some(result) = &op.result {
        println!("  Result:");
        for line in serde_json::to_string_pretty(result)?.lines() {
            println!("    {line}");
        }
    }
    println!();
    Ok(())
}
