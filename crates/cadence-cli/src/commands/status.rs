use crate::client::{ClientError, DaemonClient};
use anyhow::Result;
use cadence_core::whole_seconds;
use cadence_protocol::{Request, Response, TimerSnapshot};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq)]
struct StatusOutput {
    active: bool,
    plan: Option<String>,
    run_state: Option<&'static str>,
    segment: Option<&'static str>,
    segment_index: Option<usize>,
    segment_count: usize,
    segment_remaining_seconds: u64,
    segment_remaining_formatted: String,
    total_remaining_seconds: u64,
    total_remaining_formatted: String,
    work_completed: usize,
    work_total: usize,
    next_action: Option<&'static str>,
    started_at: Option<DateTime<Utc>>,
}

impl StatusOutput {
    fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        let segment_remaining_seconds = whole_seconds(snapshot.segment_remaining);
        let total_remaining_seconds = whole_seconds(snapshot.total_remaining);

        Self {
            active: snapshot.plan_name.is_some(),
            plan: snapshot.plan_name.clone(),
            run_state: snapshot.run_state.map(|state| state.as_str()),
            segment: snapshot.current_segment.map(|segment| segment.as_str()),
            segment_index: snapshot.segment_index,
            segment_count: snapshot.sequence.len(),
            segment_remaining_seconds,
            segment_remaining_formatted: format_duration(segment_remaining_seconds),
            total_remaining_seconds,
            total_remaining_formatted: format_duration(total_remaining_seconds),
            work_completed: snapshot.work_progress.completed,
            work_total: snapshot.work_progress.total,
            next_action: snapshot
                .run_state
                .map(|state| state.available_action().label()),
            started_at: snapshot.started_at,
        }
    }
}

pub async fn execute(json: bool) -> Result<()> {
    let client = DaemonClient::new();

    match client.send(Request::GetStatus).await {
        Ok(Response::Status(snapshot)) => {
            if json {
                let output = StatusOutput::from_snapshot(&snapshot);
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_formatted(&snapshot);
            }
        }
        Ok(Response::Error { message }) => {
            print_error(json, &message);
            std::process::exit(1);
        }
        Ok(_) => {
            print_error(json, "unexpected response from the daemon");
            std::process::exit(1);
        }
        Err(ClientError::DaemonNotRunning) => {
            if json {
                println!(r#"{{"error": "daemon not running", "active": false}}"#);
            } else {
                println!("Daemon not running");
            }
        }
        Err(error) => {
            print_error(json, &error.to_string());
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_error(json: bool, message: &str) {
    if json {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("Error: {}", message);
    }
}

pub(crate) fn print_formatted(snapshot: &TimerSnapshot) {
    let Some(plan) = &snapshot.plan_name else {
        println!("No active session");
        return;
    };

    let (Some(run_state), Some(segment), Some(index)) = (
        snapshot.run_state,
        snapshot.current_segment,
        snapshot.segment_index,
    ) else {
        println!("Session with plan {} is ready, not started yet", plan);
        println!(
            "   Total: {}",
            format_duration(whole_seconds(snapshot.total_remaining))
        );
        return;
    };

    println!(
        "{} ({}) - {}",
        segment.headline(),
        run_state.as_str(),
        plan
    );
    println!(
        "   Segment: {} of {} ({})",
        index + 1,
        snapshot.sequence.len(),
        segment.as_str()
    );
    println!(
        "   Remaining: {}",
        format_duration(whole_seconds(snapshot.segment_remaining))
    );
    println!(
        "   Session remaining: {}",
        format_duration(whole_seconds(snapshot.total_remaining))
    );
    println!("   Work completed: {}", snapshot.work_progress);
    println!(
        "   Next action: {}",
        run_state.available_action().label()
    );
    if let Some(started_at) = snapshot.started_at {
        println!(
            "   Started at: {}",
            started_at.with_timezone(&Local).format("%H:%M")
        );
    }
}

pub(crate) fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remaining_seconds = seconds % 60;

    if hours > 0 {
        format!("{} h {} min {} sec", hours, minutes, remaining_seconds)
    } else if minutes > 0 {
        format!("{} min {} sec", minutes, remaining_seconds)
    } else {
        format!("{} sec", remaining_seconds)
    }
}
