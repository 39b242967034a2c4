mod actions;
mod notifier;
mod timer;
#[cfg(target_os = "linux")]
mod tray;

pub use actions::{dispatch_user_actions, UserAction};
pub use notifier::NotifierActor;
pub use timer::{TimerActor, TimerHandle};
#[cfg(target_os = "linux")]
pub use tray::{spawn_tray, TrayHandle};
