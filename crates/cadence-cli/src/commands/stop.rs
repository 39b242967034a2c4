use anyhow::Result;
use cadence_protocol::Request;
use dialoguer::Confirm;

pub async fn execute(skip_confirmation: bool) -> Result<()> {
    if !skip_confirmation {
        let confirmed = Confirm::new()
            .with_prompt("Discard the current focus session?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled");
            return Ok(());
        }
    }

    super::acknowledge(Request::DeleteSession, "Session discarded").await
}
