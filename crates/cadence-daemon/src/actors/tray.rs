use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use cadence_core::{whole_seconds, CountdownSegment, RunState, TimerEvent, WorkProgress};
use ksni::{self, menu::StandardItem, Icon, MenuItem, TrayService};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::UserAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrayState {
    #[default]
    Inactive,
    Running,
    Paused,
    SegmentEnded,
}

impl TrayState {
    fn icon_name(&self) -> &'static str {
        match self {
            TrayState::Inactive => "appointment-soon",
            TrayState::Running => "user-available",
            TrayState::Paused => "user-away",
            TrayState::SegmentEnded => "dialog-information",
        }
    }
}

/// What the tray shows, folded from the timer event stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrayView {
    state: TrayState,
    segment: Option<CountdownSegment>,
    progress: WorkProgress,
    segment_remaining: Duration,
}

impl TrayView {
    pub fn apply(&mut self, event: &TimerEvent) {
        match event {
            TimerEvent::SegmentSelected {
                segment, progress, ..
            } => {
                self.segment = Some(*segment);
                self.progress = *progress;
                self.segment_remaining = segment.duration();
            }
            TimerEvent::SegmentRemainingChanged {
                segment_remaining, ..
            } => {
                self.segment_remaining = *segment_remaining;
            }
            TimerEvent::RunStateChanged(run_state) => {
                self.state = match run_state {
                    RunState::Running => TrayState::Running,
                    RunState::Paused => TrayState::Paused,
                    RunState::SegmentEnded => TrayState::SegmentEnded,
                };
            }
            TimerEvent::SessionFinished { .. } | TimerEvent::SessionDeleted => {
                *self = Self::default();
            }
        }
    }

    pub fn state(&self) -> TrayState {
        self.state
    }

    pub fn tooltip_title(&self) -> String {
        match self.segment {
            Some(segment) if self.state != TrayState::Inactive => {
                format!("{} ({})", segment.headline(), self.progress)
            }
            _ => "Cadence".to_string(),
        }
    }

    pub fn tooltip_description(&self) -> String {
        match self.state {
            TrayState::Inactive => "No active session".to_string(),
            TrayState::Running => format!("{} left", format_clock(self.segment_remaining)),
            TrayState::Paused => format!("Paused, {} left", format_clock(self.segment_remaining)),
            TrayState::SegmentEnded => "Segment over, waiting for next".to_string(),
        }
    }

    pub fn available_actions(&self) -> Vec<UserAction> {
        let run_state = match self.state {
            TrayState::Inactive => return Vec::new(),
            TrayState::Running => RunState::Running,
            TrayState::Paused => RunState::Paused,
            TrayState::SegmentEnded => RunState::SegmentEnded,
        };
        vec![
            UserAction::Timer(run_state.available_action()),
            UserAction::Stop,
        ]
    }
}

fn format_clock(duration: Duration) -> String {
    let seconds = whole_seconds(duration);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn lock_view(view: &Mutex<TrayView>) -> MutexGuard<'_, TrayView> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

struct CadenceTray {
    view: Arc<Mutex<TrayView>>,
    actions: mpsc::UnboundedSender<UserAction>,
}

impl CadenceTray {
    fn dispatch(&self, action: UserAction) {
        debug!(?action, "tray action selected");
        if self.actions.send(action).is_err() {
            warn!(?action, "tray action dropped, dispatcher is gone");
        }
    }
}

impl ksni::Tray for CadenceTray {
    fn id(&self) -> String {
        "cadence".to_string()
    }

    fn title(&self) -> String {
        "Cadence".to_string()
    }

    fn icon_pixmap(&self) -> Vec<Icon> {
        vec![]
    }

    fn icon_name(&self) -> String {
        lock_view(&self.view).state().icon_name().to_string()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        let view = lock_view(&self.view);
        ksni::ToolTip {
            title: view.tooltip_title(),
            description: view.tooltip_description(),
            icon_name: String::new(),
            icon_pixmap: vec![],
        }
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        lock_view(&self.view)
            .available_actions()
            .into_iter()
            .map(|action| {
                StandardItem {
                    label: action.label().to_string(),
                    activate: Box::new(move |tray: &mut Self| tray.dispatch(action)),
                    ..Default::default()
                }
                .into()
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct TrayStateHandle {
    view: Arc<Mutex<TrayView>>,
    ksni_handle: ksni::Handle<CadenceTray>,
}

impl TrayStateHandle {
    pub fn apply(&self, event: &TimerEvent) {
        let state = {
            let mut view = lock_view(&self.view);
            view.apply(event);
            view.state()
        };
        if !matches!(event, TimerEvent::SegmentRemainingChanged { .. }) {
            debug!(?state, "tray state updated");
        }
        self.ksni_handle.update(|_| {});
    }

    /// Mirrors timer events into the tray until the stream closes.
    pub async fn follow(self, mut events: broadcast::Receiver<TimerEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.apply(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "tray lagged behind timer events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("tray follower stopped");
    }
}

pub struct TrayHandle {
    ksni_handle: ksni::Handle<CadenceTray>,
    thread_handle: Option<thread::JoinHandle<()>>,
    pub state_handle: TrayStateHandle,
}

impl TrayHandle {
    pub fn shutdown(&mut self) {
        self.ksni_handle.shutdown();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TrayHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn spawn_tray(actions: mpsc::UnboundedSender<UserAction>) -> std::io::Result<TrayHandle> {
    let view = Arc::new(Mutex::new(TrayView::default()));
    let tray = CadenceTray {
        view: Arc::clone(&view),
        actions,
    };

    let service = TrayService::new(tray);
    let ksni_handle = service.handle();

    let state_handle = TrayStateHandle {
        view,
        ksni_handle: ksni_handle.clone(),
    };

    let thread_handle = thread::Builder::new()
        .name("cadence-tray".to_string())
        .spawn(move || {
            info!("tray icon initialized");
            if let Err(error) = service.run() {
                warn!(%error, "tray service error");
            }
            debug!("tray service stopped");
        })?;

    Ok(TrayHandle {
        ksni_handle,
        thread_handle: Some(thread_handle),
        state_handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::TimerAction;

    fn minutes(value: u64) -> Duration {
        Duration::from_secs(value * 60)
    }

    fn running_view() -> TrayView {
        let mut view = TrayView::default();
        view.apply(&TimerEvent::SegmentSelected {
            index: 0,
            segment: CountdownSegment::Work(minutes(20)),
            progress: WorkProgress {
                completed: 1,
                total: 4,
            },
        });
        view.apply(&TimerEvent::RunStateChanged(RunState::Running));
        view
    }

    #[test]
    fn tray_state_has_distinct_icons() {
        assert_eq!(TrayState::Inactive.icon_name(), "appointment-soon");
        assert_eq!(TrayState::Running.icon_name(), "user-available");
        assert_eq!(TrayState::Paused.icon_name(), "user-away");
        assert_eq!(TrayState::SegmentEnded.icon_name(), "dialog-information");
    }

    #[test]
    fn idle_view_offers_no_actions() {
        let view = TrayView::default();

        assert_eq!(view.tooltip_title(), "Cadence");
        assert_eq!(view.tooltip_description(), "No active session");
        assert!(view.available_actions().is_empty());
    }

    #[test]
    fn running_view_shows_remaining_and_pause() {
        let mut view = running_view();
        view.apply(&TimerEvent::SegmentRemainingChanged {
            segment_remaining: Duration::from_secs(754),
            total_remaining: minutes(100),
        });

        assert_eq!(view.tooltip_title(), "Working (1/4)");
        assert_eq!(view.tooltip_description(), "12:34 left");
        assert_eq!(
            view.available_actions(),
            vec![UserAction::Timer(TimerAction::Pause), UserAction::Stop]
        );
    }

    #[test]
    fn actions_follow_run_state() {
        let mut view = running_view();

        view.apply(&TimerEvent::RunStateChanged(RunState::Paused));
        assert_eq!(
            view.available_actions()[0],
            UserAction::Timer(TimerAction::Resume)
        );

        view.apply(&TimerEvent::RunStateChanged(RunState::SegmentEnded));
        assert_eq!(view.available_actions()[0].label(), "Next");
    }

    #[test]
    fn terminal_event_resets_view() {
        let mut view = running_view();

        view.apply(&TimerEvent::SessionDeleted);

        assert_eq!(view, TrayView::default());
    }
}
