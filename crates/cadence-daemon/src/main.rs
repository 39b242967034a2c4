mod actors;
mod countdown;
mod plans;
mod server;

use std::sync::Arc;

#[cfg(target_os = "linux")]
use actors::{spawn_tray, TrayHandle, UserAction};
use actors::{dispatch_user_actions, NotifierActor, TimerActor};
use anyhow::Result;
use cadence_adapters::SqliteFocusPlanRepository;
use cadence_core::{Config, FocusPlanRepository};
use plans::PlanCatalog;
use server::{default_socket_path, Server};
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("cadence_daemon=debug".parse()?),
        )
        .init();

    info!("cadence daemon starting");

    let config = Config::load().unwrap_or_else(|error| {
        warn!(%error, "failed to load config, using defaults");
        Config::default()
    });

    let (shutdown_sender, shutdown_receiver) = broadcast::channel::<()>(1);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("SIGINT received, initiating shutdown");
        shutdown_sender.send(()).ok();
    });

    let (timer_actor, timer_handle) = TimerActor::new(config.timer.tick_interval());
    let (action_sender, action_receiver) = mpsc::unbounded_channel();

    if config.notifications.enabled {
        let notifier_actor = NotifierActor::new(
            timer_handle.subscribe(),
            config.notifications.urgency.clone(),
            config.notifications.sound_enabled,
        )
        .with_actions(action_sender.clone());
        tokio::spawn(notifier_actor.run());
    }

    #[cfg(target_os = "linux")]
    let _tray_handle = if config.tray.enabled {
        start_tray(&timer_handle, action_sender.clone())
    } else {
        None
    };

    drop(action_sender);
    tokio::spawn(dispatch_user_actions(action_receiver, timer_handle.clone()));

    tokio::spawn(timer_actor.run());

    let catalog = PlanCatalog::new(create_plan_repository(), &config.timer);
    let server = Server::new(default_socket_path(), timer_handle, catalog);
    server.run(shutdown_receiver).await?;

    info!("cadence daemon stopped");
    Ok(())
}

#[cfg(target_os = "linux")]
fn start_tray(
    timer_handle: &actors::TimerHandle,
    actions: mpsc::UnboundedSender<UserAction>,
) -> Option<TrayHandle> {
    match spawn_tray(actions) {
        Ok(handle) => {
            tokio::spawn(handle.state_handle.clone().follow(timer_handle.subscribe()));
            Some(handle)
        }
        Err(error) => {
            warn!(%error, "tray initialization failed, continuing without tray");
            None
        }
    }
}

fn create_plan_repository() -> Option<Arc<dyn FocusPlanRepository>> {
    let database_path = Config::plans_database_path()?;

    if let Some(data_dir) = database_path.parent() {
        if let Err(error) = std::fs::create_dir_all(data_dir) {
            warn!(%error, "failed to create data directory, only built-in plans are available");
            return None;
        }
    }

    match SqliteFocusPlanRepository::new(&database_path) {
        Ok(repository) => {
            info!(?database_path, "plan storage enabled");
            Some(Arc::new(repository))
        }
        Err(error) => {
            warn!(%error, "failed to open plan storage, only built-in plans are available");
            None
        }
    }
}
