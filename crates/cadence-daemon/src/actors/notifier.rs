use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
#[cfg(target_os = "linux")]
use std::thread;
use std::time::Duration;

use cadence_core::{
    whole_seconds, CountdownSegment, NotificationUrgency, RunState, TimerAction, TimerEvent,
    WorkProgress,
};
#[cfg(target_os = "linux")]
use notify_rust::{Hint, NotificationHandle, Timeout};
use notify_rust::{Notification, Urgency};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::UserAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub summary: String,
    pub body: String,
    /// Button offered on the notification, if the session can be acted on.
    pub action: Option<TimerAction>,
    /// False for silent refreshes of the remaining time.
    pub alert: bool,
}

/// Turns the timer event stream into the notification a user should see.
///
/// Ticks refresh the remaining time without alerting. The `Running`
/// transition that follows a segment selection is folded into the
/// selection itself.
#[derive(Debug, Default)]
pub struct NotificationTracker {
    segment: Option<CountdownSegment>,
    progress: WorkProgress,
    run_state: Option<RunState>,
    selection_pending: bool,
}

impl NotificationTracker {
    pub fn observe(&mut self, event: &TimerEvent) -> Option<NotificationContent> {
        match event {
            TimerEvent::SegmentSelected {
                segment, progress, ..
            } => {
                self.segment = Some(*segment);
                self.progress = *progress;
                self.run_state = Some(RunState::Running);
                self.selection_pending = true;

                Some(self.alert(
                    *segment,
                    format!(
                        "{} of {}. {} with `cadence pause`.",
                        format_minutes(segment.duration()),
                        describe(*segment),
                        TimerAction::Pause.label(),
                    ),
                ))
            }
            TimerEvent::RunStateChanged(RunState::Running) => {
                self.run_state = Some(RunState::Running);
                if std::mem::take(&mut self.selection_pending) {
                    return None;
                }
                let segment = self.segment?;
                Some(self.alert(segment, format!("Resumed {}.", describe(segment))))
            }
            TimerEvent::RunStateChanged(RunState::Paused) => {
                self.run_state = Some(RunState::Paused);
                self.selection_pending = false;
                let segment = self.segment?;
                Some(self.alert(
                    segment,
                    format!(
                        "Paused. {} with `cadence resume`.",
                        TimerAction::Resume.label()
                    ),
                ))
            }
            TimerEvent::RunStateChanged(RunState::SegmentEnded) => {
                self.run_state = Some(RunState::SegmentEnded);
                self.selection_pending = false;
                let segment = self.segment?;
                if segment.is_work() {
                    self.progress.completed += 1;
                }
                Some(self.alert(
                    segment,
                    format!(
                        "{} is over. {} with `cadence next`.",
                        capitalize(describe(segment)),
                        TimerAction::NextSegment.label(),
                    ),
                ))
            }
            TimerEvent::SegmentRemainingChanged {
                segment_remaining, ..
            } => {
                if self.run_state != Some(RunState::Running) {
                    return None;
                }
                let segment = self.segment?;
                Some(NotificationContent {
                    summary: self.title(segment),
                    body: format!(
                        "{} left of {}.",
                        format_minutes(Duration::from_secs(whole_seconds(*segment_remaining))),
                        describe(segment)
                    ),
                    action: Some(TimerAction::Pause),
                    alert: false,
                })
            }
            TimerEvent::SessionFinished { progress } => {
                *self = Self::default();
                Some(NotificationContent {
                    summary: "Session Completed!".to_string(),
                    body: format!("{} work segments completed.", progress),
                    action: None,
                    alert: true,
                })
            }
            TimerEvent::SessionDeleted => {
                *self = Self::default();
                Some(NotificationContent {
                    summary: "Session Stopped".to_string(),
                    body: "The focus session was discarded.".to_string(),
                    action: None,
                    alert: true,
                })
            }
        }
    }

    fn alert(&self, segment: CountdownSegment, body: String) -> NotificationContent {
        NotificationContent {
            summary: self.title(segment),
            body,
            action: self.run_state.map(|state| state.available_action()),
            alert: true,
        }
    }

    fn title(&self, segment: CountdownSegment) -> String {
        format!("{} ({} work completed!)", segment.headline(), self.progress)
    }
}

fn describe(segment: CountdownSegment) -> &'static str {
    match segment {
        CountdownSegment::Work(_) => "focus",
        CountdownSegment::ShortBreak(_) => "short break",
        CountdownSegment::LongBreak(_) => "long break",
    }
}

fn capitalize(text: &str) -> String {
    let mut characters = text.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

fn format_minutes(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds % 60 == 0 {
        format!("{}min", seconds / 60)
    } else {
        format!("{}min {}s", seconds / 60, seconds % 60)
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn action_id(action: TimerAction) -> &'static str {
    match action {
        TimerAction::Pause => "pause",
        TimerAction::Resume => "resume",
        TimerAction::NextSegment => "next",
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_action_id(identifier: &str) -> Option<TimerAction> {
    match identifier {
        "pause" => Some(TimerAction::Pause),
        "resume" => Some(TimerAction::Resume),
        "next" => Some(TimerAction::NextSegment),
        _ => None,
    }
}

/// The single notification that stays on screen while a session runs.
///
/// Every update replaces it by the id the server assigned last. A session's
/// closing notification replaces it one final time and forgets it.
#[derive(Debug, Default)]
struct LiveNotification {
    id: Option<u32>,
    listening: Option<(u32, TimerAction)>,
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
impl LiveNotification {
    fn replaces(&self) -> Option<u32> {
        self.id
    }

    /// Records a shown notification; true when its button needs a new listener.
    fn shown(&mut self, id: u32, content: &NotificationContent) -> bool {
        let Some(action) = content.action else {
            *self = Self::default();
            return false;
        };

        self.id = Some(id);
        if self.listening == Some((id, action)) {
            return false;
        }
        self.listening = Some((id, action));
        true
    }
}

pub struct NotifierActor {
    events: broadcast::Receiver<TimerEvent>,
    tracker: NotificationTracker,
    urgency: Urgency,
    sound_enabled: bool,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    live: LiveNotification,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    actions: Option<mpsc::UnboundedSender<UserAction>>,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    listener_generation: Arc<AtomicU64>,
}

impl NotifierActor {
    pub fn new(
        events: broadcast::Receiver<TimerEvent>,
        urgency: NotificationUrgency,
        sound_enabled: bool,
    ) -> Self {
        let urgency = match urgency {
            NotificationUrgency::Low => Urgency::Low,
            NotificationUrgency::Normal => Urgency::Normal,
            NotificationUrgency::Critical => Urgency::Critical,
        };

        Self {
            events,
            tracker: NotificationTracker::default(),
            urgency,
            sound_enabled,
            live: LiveNotification::default(),
            actions: None,
            listener_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Routes notification buttons to the user action dispatcher.
    pub fn with_actions(mut self, actions: mpsc::UnboundedSender<UserAction>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub async fn run(mut self) {
        info!("notifier actor started");

        loop {
            match self.events.recv().await {
                Ok(event) => {
                    if let Some(content) = self.tracker.observe(&event) {
                        self.show(&content);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notifier lagged behind timer events");
                }
                Err(RecvError::Closed) => break,
            }
        }

        self.listener_generation.fetch_add(1, Ordering::SeqCst);
        debug!("notifier actor stopped");
    }

    fn show(&mut self, content: &NotificationContent) {
        match self.build_notification(content).show() {
            Ok(handle) => {
                if content.alert {
                    debug!(summary = %content.summary, "notification sent");
                }
                #[cfg(target_os = "linux")]
                self.track(handle, content);
                #[cfg(not(target_os = "linux"))]
                let _ = handle;
            }
            Err(error) => {
                warn!(%error, summary = %content.summary, "failed to show notification");
            }
        }
    }

    fn build_notification(&self, content: &NotificationContent) -> Notification {
        let mut notification = Notification::new();
        notification
            .summary(&content.summary)
            .body(&content.body)
            .urgency(self.urgency)
            .appname("Cadence");

        if content.alert && self.sound_enabled {
            notification.sound_name("message-new-instant");
        }

        #[cfg(target_os = "linux")]
        {
            if let Some(id) = self.live.replaces() {
                notification.id(id);
            }
            if let Some(action) = content.action {
                notification
                    .hint(Hint::Resident(true))
                    .timeout(Timeout::Never);
                if self.actions.is_some() {
                    notification.action(action_id(action), action.label());
                }
            }
        }

        notification
    }

    /// Remembers the live notification and listens for its button.
    #[cfg(target_os = "linux")]
    fn track(&mut self, handle: NotificationHandle, content: &NotificationContent) {
        let needs_listener = self.live.shown(handle.id(), content);
        if content.action.is_none() {
            self.listener_generation.fetch_add(1, Ordering::SeqCst);
            return;
        }
        if !needs_listener {
            return;
        }
        let Some(sender) = self.actions.clone() else {
            return;
        };

        // Only the newest listener may dispatch; older ones linger until
        // the server closes their notification.
        let generation = self.listener_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.listener_generation);

        let spawned = thread::Builder::new()
            .name("cadence-notification".to_string())
            .spawn(move || {
                handle.wait_for_action(|identifier| {
                    if current.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    match parse_action_id(identifier) {
                        Some(action) => {
                            debug!(?action, "notification action invoked");
                            if sender.send(UserAction::Timer(action)).is_err() {
                                warn!(?action, "notification action dropped, dispatcher is gone");
                            }
                        }
                        None => debug!(identifier, "notification closed without action"),
                    }
                });
            });

        if let Err(error) = spawned {
            warn!(%error, "failed to listen for notification actions");
        }
    }
}
