use super::status::format_duration;
use super::WorkTimeArgs;
use crate::client::{ClientError, DaemonClient};
use crate::daemon_launcher::ensure_daemon_running;
use anyhow::{bail, Result};
use cadence_core::domain::segment::{total_duration, work_segment_count};
use cadence_protocol::{CountdownSegment, Request, Response};

pub async fn execute(plan: Option<String>, work_time: WorkTimeArgs) -> Result<()> {
    let total_work_seconds = work_time.total_seconds()?;
    ensure_daemon_running().await?;

    match DaemonClient::new()
        .send(Request::PreviewSequence {
            plan,
            total_work_seconds,
        })
        .await
    {
        Ok(Response::Sequence {
            plan_name,
            sequence,
        }) => {
            println!("Plan {}", plan_name);
            print_sequence(&sequence);
        }
        Ok(Response::Error { message }) => {
            bail!("{}", message);
        }
        Ok(_) => {
            bail!("unexpected response from the daemon");
        }
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(error) => {
            bail!("{}", error);
        }
    }

    Ok(())
}

pub(crate) fn print_sequence(sequence: &[CountdownSegment]) {
    println!("   Sequence: {}", format_sequence(sequence));
    println!(
        "   {} segments ({} work), {} in total",
        sequence.len(),
        work_segment_count(sequence),
        format_duration(total_duration(sequence).as_secs())
    );
}

/// Compact rendering such as `W20 S5 W20 L15 W10`, in minutes.
pub(crate) fn format_sequence(sequence: &[CountdownSegment]) -> String {
    sequence
        .iter()
        .map(|segment| {
            let letter = match segment {
                CountdownSegment::Work(_) => 'W',
                CountdownSegment::ShortBreak(_) => 'S',
                CountdownSegment::LongBreak(_) => 'L',
            };
            let seconds = segment.duration().as_secs();
            if seconds % 60 == 0 {
                format!("{}{}", letter, seconds / 60)
            } else {
                format!("{}{}:{:02}", letter, seconds / 60, seconds % 60)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{generate_sequence, FocusPlan};
    use std::time::Duration;

    #[test]
    fn pomodoro_sequence_renders_compactly() {
        let sequence =
            generate_sequence(&FocusPlan::pomodoro(), Duration::from_secs(130 * 60)).unwrap();

        assert_eq!(
            format_sequence(&sequence),
            "W20 S5 W20 S5 W20 S5 W20 L15 W20 S5 W20 S5 W10"
        );
    }

    #[test]
    fn partial_minutes_show_seconds() {
        let sequence = [
            CountdownSegment::Work(Duration::from_secs(90)),
            CountdownSegment::ShortBreak(Duration::from_secs(30)),
        ];

        assert_eq!(format_sequence(&sequence), "W1:30 S0:30");
    }
}
