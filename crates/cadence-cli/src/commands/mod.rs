mod next;
mod pause;
mod plan;
mod preview;
mod resume;
mod start;
mod status;
mod stop;
mod watch;

pub use next::execute as next;
pub use pause::execute as pause;
pub use plan::{execute as plan, PlanCommand};
pub use preview::execute as preview;
pub use resume::execute as resume;
pub use start::execute as start;
pub use status::execute as status;
pub use stop::execute as stop;
pub use watch::execute as watch;

use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use cadence_core::TimerError;
use cadence_protocol::{Request, Response};
use clap::Args;

/// Total work time of a session; every unit is optional and they add up.
#[derive(Args, Debug, Default, Clone)]
pub struct WorkTimeArgs {
    /// Hours of work
    #[arg(long)]
    pub hours: Option<u64>,
    /// Minutes of work
    #[arg(long)]
    pub minutes: Option<u64>,
    /// Seconds of work
    #[arg(long)]
    pub seconds: Option<u64>,
}

impl WorkTimeArgs {
    /// `None` when no unit was given, so the daemon's configured default applies.
    pub fn total_seconds(&self) -> Result<Option<u64>> {
        if self.hours.is_none() && self.minutes.is_none() && self.seconds.is_none() {
            return Ok(None);
        }

        let total = self
            .hours
            .unwrap_or(0)
            .checked_mul(3600)
            .zip(self.minutes.unwrap_or(0).checked_mul(60))
            .and_then(|(hours, minutes)| hours.checked_add(minutes))
            .and_then(|total| total.checked_add(self.seconds.unwrap_or(0)));

        let Some(total) = total else {
            bail!("total work time is too large");
        };

        if total == 0 {
            bail!("total work time must be greater than zero");
        }

        Ok(Some(total))
    }
}

async fn acknowledge(request: Request, success: &str) -> Result<()> {
    match DaemonClient::new().send(request).await {
        Ok(Response::Ok) => {
            println!("{}", success);
        }
        Ok(Response::Error { message }) => {
            if message == TimerError::NoSession.to_string() {
                println!("No active session");
            } else {
                bail!("{}", message);
            }
        }
        Ok(_) => {
            bail!("unexpected response from the daemon");
        }
        Err(ClientError::DaemonNotRunning) => daemon_not_running(),
        Err(error) => {
            bail!("{}", error);
        }
    }

    Ok(())
}

fn daemon_not_running() -> ! {
    eprintln!("The daemon is not running");
    eprintln!("   Start a session first with: cadence start");
    std::process::exit(1);
}
