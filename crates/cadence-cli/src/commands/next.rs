use anyhow::Result;
use cadence_protocol::Request;

/// Starts the next segment; a running segment is skipped.
pub async fn execute() -> Result<()> {
    super::acknowledge(Request::NextSegment, "Next segment started").await
}
