use cadence_core::TimerAction;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::TimerHandle;

/// Something a user asked for from a desktop surface (tray menu or
/// notification button).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Timer(TimerAction),
    Stop,
}

impl UserAction {
    pub fn label(&self) -> &'static str {
        match self {
            UserAction::Timer(action) => action.label(),
            UserAction::Stop => "Stop",
        }
    }
}

/// Forwards user actions to the timer until every sender is gone.
pub async fn dispatch_user_actions(
    mut actions: mpsc::UnboundedReceiver<UserAction>,
    timer: TimerHandle,
) {
    while let Some(action) = actions.recv().await {
        let result = match action {
            UserAction::Timer(TimerAction::Pause) => timer.pause().await,
            UserAction::Timer(TimerAction::Resume) => timer.resume().await,
            UserAction::Timer(TimerAction::NextSegment) => {
                timer.start_next_segment().await.map(|_| ())
            }
            UserAction::Stop => timer.delete().await,
        };

        if let Err(error) = result {
            warn!(%error, ?action, "user action rejected");
        }
    }
    debug!("user action dispatcher stopped");
}
