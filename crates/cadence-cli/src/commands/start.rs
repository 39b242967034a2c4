use super::preview::print_sequence;
use super::WorkTimeArgs;
use crate::client::{ClientError, DaemonClient};
use crate::daemon_launcher::ensure_daemon_running;
use anyhow::{bail, Result};
use cadence_protocol::{Request, Response};

pub async fn execute(plan: Option<String>, work_time: WorkTimeArgs) -> Result<()> {
    let total_work_seconds = work_time.total_seconds()?;
    ensure_daemon_running().await?;

    let client = DaemonClient::new();

    match client
        .send(Request::StartSession {
            plan,
            total_work_seconds,
        })
        .await
    {
        Ok(Response::SessionStarted {
            plan_name,
            sequence,
        }) => {
            println!("Session started with plan {}", plan_name);
            print_sequence(&sequence);
            if let Some(first) = sequence.first() {
                println!("   {} now", first.headline());
            }
        }
        Ok(Response::Error { message }) => {
            bail!("{}", message);
        }
        Ok(_) => {
            bail!("unexpected response from the daemon");
        }
        Err(ClientError::DaemonNotRunning) => super::daemon_not_running(),
        Err(ClientError::Timeout) => {
            bail!("timed out connecting to the daemon");
        }
        Err(error) => {
            bail!("{}", error);
        }
    }

    Ok(())
}
