use crate::client::{default_socket_path, ClientError, DaemonClient};
use anyhow::{bail, Context, Result};
use cadence_protocol::{Request, Response};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;

const DAEMON_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const DAEMON_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DAEMON_NAME: &str = "cadence-daemon";

/// Pings the daemon and spawns it in the background when nothing answers.
pub async fn ensure_daemon_running() -> Result<()> {
    match DaemonClient::new().send(Request::Ping).await {
        Ok(Response::Pong) => return Ok(()),
        Ok(_) | Err(ClientError::DaemonNotRunning) => {}
        Err(error) => return Err(error.into()),
    }

    println!("Starting the daemon...");

    spawn_daemon()?;
    wait_for_socket().await?;

    Ok(())
}

fn spawn_daemon() -> Result<()> {
    let daemon_path = find_daemon_binary()?;

    Command::new(&daemon_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to launch {}", daemon_path.display()))?;

    Ok(())
}

fn find_daemon_binary() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CADENCE_DAEMON_PATH") {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().context("cannot locate the current executable")?;
    let exe_dir = current_exe
        .parent()
        .context("cannot locate the executable's directory")?;

    let sibling_path = exe_dir.join(DAEMON_NAME);
    if sibling_path.exists() {
        return Ok(sibling_path);
    }

    if let Ok(path) = which::which(DAEMON_NAME) {
        return Ok(path);
    }

    bail!("{DAEMON_NAME} not found. Install it or set CADENCE_DAEMON_PATH");
}

async fn wait_for_socket() -> Result<()> {
    let socket_path = default_socket_path();
    let start = std::time::Instant::now();

    while start.elapsed() < DAEMON_STARTUP_TIMEOUT {
        if socket_path.exists() {
            return Ok(());
        }
        sleep(DAEMON_POLL_INTERVAL).await;
    }

    bail!(
        "the daemon did not start within {} seconds",
        DAEMON_STARTUP_TIMEOUT.as_secs()
    );
}
