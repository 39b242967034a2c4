use anyhow::Result;
use cadence_protocol::Request;

pub async fn execute() -> Result<()> {
    super::acknowledge(Request::PauseSession, "Timer paused").await
}
