use super::status::{format_duration, print_formatted};
use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use cadence_core::whole_seconds;
use cadence_protocol::{Response, RunState, TimerEvent};
use std::io::Write;

/// Follows the timer live until the session finishes or is deleted.
pub async fn execute() -> Result<()> {
    let mut subscription = match DaemonClient::new().subscribe().await {
        Ok(subscription) => subscription,
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(error) => bail!("{}", error),
    };

    let mut stdout = std::io::stdout();
    let mut countdown_line = false;

    loop {
        match subscription.next_response().await? {
            Response::Status(snapshot) => {
                print_formatted(&snapshot);
            }
            Response::Event(event) => {
                let line = describe_event(&event);
                if matches!(event, TimerEvent::SegmentRemainingChanged { .. }) {
                    write!(stdout, "\r{}   ", line)?;
                    stdout.flush()?;
                    countdown_line = true;
                } else {
                    if std::mem::take(&mut countdown_line) {
                        writeln!(stdout)?;
                    }
                    writeln!(stdout, "{}", line)?;
                }

                if event.is_terminal() {
                    break;
                }
            }
            Response::Error { message } => bail!("{}", message),
            _ => bail!("unexpected response from the daemon"),
        }
    }

    Ok(())
}

fn describe_event(event: &TimerEvent) -> String {
    match event {
        TimerEvent::SegmentSelected {
            index,
            segment,
            progress,
        } => format!(
            "Segment {}: {} for {} ({} work completed)",
            index + 1,
            segment.as_str(),
            format_duration(segment.duration().as_secs()),
            progress
        ),
        TimerEvent::SegmentRemainingChanged {
            segment_remaining,
            total_remaining,
        } => format!(
            "   {} left, session {}",
            format_duration(whole_seconds(*segment_remaining)),
            format_duration(whole_seconds(*total_remaining))
        ),
        TimerEvent::RunStateChanged(RunState::Running) => "Running".to_string(),
        TimerEvent::RunStateChanged(RunState::Paused) => "Paused".to_string(),
        TimerEvent::RunStateChanged(RunState::SegmentEnded) => {
            "Segment over, run `cadence next` to continue".to_string()
        }
        TimerEvent::SessionFinished { progress } => {
            format!("Session completed! {} work segments done", progress)
        }
        TimerEvent::SessionDeleted => "Session discarded".to_string(),
    }
}
