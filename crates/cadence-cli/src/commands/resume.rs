use anyhow::Result;
use cadence_protocol::Request;

pub async fn execute() -> Result<()> {
    super::acknowledge(Request::ResumeSession, "Timer resumed").await
}
