use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use cadence_core::{CountdownSegment, FocusPlan, TimerError, TimerEvent, TimerSession, TimerSnapshot};

use crate::countdown::Countdown;

const MAILBOX_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

pub enum TimerMessage {
    SetPlanAndSequence {
        plan: FocusPlan,
        sequence: Vec<CountdownSegment>,
        reply: oneshot::Sender<()>,
    },
    StartNextSegment {
        reply: oneshot::Sender<Result<CountdownSegment, TimerError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), TimerError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), TimerError>>,
    },
    Delete {
        reply: oneshot::Sender<Result<(), TimerError>>,
    },
    GetStatus {
        reply: oneshot::Sender<TimerSnapshot>,
    },
}

/// Re-dispatched countdown callbacks, tagged with the countdown they came from.
#[derive(Debug)]
enum CountdownSignal {
    Tick { generation: u64, remaining: Duration },
    Finished { generation: u64 },
}

pub struct TimerActor {
    receiver: mpsc::Receiver<TimerMessage>,
    signal_sender: mpsc::UnboundedSender<CountdownSignal>,
    signal_receiver: mpsc::UnboundedReceiver<CountdownSignal>,
    events: broadcast::Sender<TimerEvent>,
    tick_interval: Duration,
    session: Option<TimerSession>,
    countdown: Option<Countdown>,
    generation: u64,
}

#[derive(Clone)]
pub struct TimerHandle {
    sender: mpsc::Sender<TimerMessage>,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerHandle {
    pub async fn set_plan_and_sequence(
        &self,
        plan: FocusPlan,
        sequence: Vec<CountdownSegment>,
    ) -> Result<(), TimerError> {
        self.request(|reply| TimerMessage::SetPlanAndSequence {
            plan,
            sequence,
            reply,
        })
        .await
    }

    pub async fn start_next_segment(&self) -> Result<CountdownSegment, TimerError> {
        self.request(|reply| TimerMessage::StartNextSegment { reply })
            .await?
    }

    pub async fn pause(&self) -> Result<(), TimerError> {
        self.request(|reply| TimerMessage::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), TimerError> {
        self.request(|reply| TimerMessage::Resume { reply }).await?
    }

    pub async fn delete(&self) -> Result<(), TimerError> {
        self.request(|reply| TimerMessage::Delete { reply }).await?
    }

    pub async fn get_status(&self) -> Option<TimerSnapshot> {
        self.request(|reply| TimerMessage::GetStatus { reply })
            .await
            .ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> TimerMessage,
    ) -> Result<T, TimerError> {
        let (reply_sender, reply_receiver) = oneshot::channel();
        self.sender
            .send(message(reply_sender))
            .await
            .map_err(|_| TimerError::Unavailable)?;
        reply_receiver.await.map_err(|_| TimerError::Unavailable)
    }
}

impl TimerActor {
    pub fn new(tick_interval: Duration) -> (Self, TimerHandle) {
        let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
        let (signal_sender, signal_receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = Self {
            receiver,
            signal_sender,
            signal_receiver,
            events: events.clone(),
            tick_interval,
            session: None,
            countdown: None,
            generation: 0,
        };

        let handle = TimerHandle { sender, events };

        (actor, handle)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                message = self.receiver.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => break,
                    }
                }
                Some(signal) = self.signal_receiver.recv() => {
                    self.handle_signal(signal);
                }
            }
        }

        self.retire_countdown();
        debug!("timer actor stopped");
    }

    fn handle_message(&mut self, message: TimerMessage) {
        match message {
            TimerMessage::SetPlanAndSequence {
                plan,
                sequence,
                reply,
            } => {
                self.install_session(plan, sequence);
                let _ = reply.send(());
            }
            TimerMessage::StartNextSegment { reply } => {
                let _ = reply.send(self.start_next_segment());
            }
            TimerMessage::Pause { reply } => {
                let _ = reply.send(self.pause());
            }
            TimerMessage::Resume { reply } => {
                let _ = reply.send(self.resume());
            }
            TimerMessage::Delete { reply } => {
                let _ = reply.send(self.delete());
            }
            TimerMessage::GetStatus { reply } => {
                let status = self
                    .session
                    .as_ref()
                    .map(TimerSession::snapshot)
                    .unwrap_or_else(TimerSnapshot::idle);
                let _ = reply.send(status);
            }
        }
    }

    fn handle_signal(&mut self, signal: CountdownSignal) {
        match signal {
            CountdownSignal::Tick {
                generation,
                remaining,
            } => {
                if generation != self.generation {
                    debug!(generation, "dropping tick from retired countdown");
                    return;
                }
                let event = self
                    .session
                    .as_mut()
                    .and_then(|session| session.record_tick(remaining));
                if let Some(event) = event {
                    self.publish(event);
                }
            }
            CountdownSignal::Finished { generation } => {
                if generation != self.generation {
                    debug!(generation, "dropping finish from retired countdown");
                    return;
                }
                self.finish_segment();
            }
        }
    }

    fn install_session(&mut self, plan: FocusPlan, sequence: Vec<CountdownSegment>) {
        if self.session.take().is_some() {
            warn!("replacing the active session");
            self.retire_countdown();
            self.publish(TimerEvent::SessionDeleted);
        }

        info!(plan = %plan.name, segments = sequence.len(), "session installed");
        self.session = Some(TimerSession::new(plan, sequence));
    }

    fn start_next_segment(&mut self) -> Result<CountdownSegment, TimerError> {
        let session = self.session.as_mut().ok_or(TimerError::NoSession)?;
        let events = session.start_next_segment()?;
        let segment = session
            .current_segment()
            .ok_or(TimerError::SequenceExhausted)?;

        info!(?segment, index = ?session.segment_index(), "segment started");

        self.publish_all(events);
        self.arm_countdown(segment.duration());

        Ok(segment)
    }

    fn pause(&mut self) -> Result<(), TimerError> {
        let session = self.session.as_mut().ok_or(TimerError::NoSession)?;
        let events = session.pause()?;

        if !events.is_empty() {
            self.retire_countdown();
            info!("timer paused");
            self.publish_all(events);
        }

        Ok(())
    }

    fn resume(&mut self) -> Result<(), TimerError> {
        let session = self.session.as_mut().ok_or(TimerError::NoSession)?;
        let events = session.resume()?;
        let remaining = session.segment_remaining();

        info!(?remaining, "timer resumed");
        self.publish_all(events);
        self.arm_countdown(remaining);

        Ok(())
    }

    fn delete(&mut self) -> Result<(), TimerError> {
        if self.session.take().is_none() {
            return Err(TimerError::NoSession);
        }

        self.retire_countdown();
        info!("session deleted");
        self.publish(TimerEvent::SessionDeleted);

        Ok(())
    }

    fn finish_segment(&mut self) {
        self.retire_countdown();

        let Some(session) = self.session.as_mut() else {
            return;
        };

        let events = session.finish_segment();
        let complete = session.is_complete();
        self.publish_all(events);

        if complete {
            info!("session completed");
            self.session = None;
        } else {
            debug!("segment ended, waiting for next");
        }
    }

    fn arm_countdown(&mut self, duration: Duration) {
        self.retire_countdown();

        let generation = self.generation;
        let tick_sender = self.signal_sender.clone();
        let finish_sender = self.signal_sender.clone();

        let mut countdown = Countdown::new(
            duration,
            self.tick_interval,
            move |remaining| {
                let _ = tick_sender.send(CountdownSignal::Tick {
                    generation,
                    remaining,
                });
            },
            move || {
                let _ = finish_sender.send(CountdownSignal::Finished { generation });
            },
        );
        countdown.start();

        self.countdown = Some(countdown);
    }

    /// Cancels the active countdown and invalidates any of its queued signals.
    fn retire_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.generation += 1;
    }

    fn publish_all(&self, events: Vec<TimerEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    fn publish(&self, event: TimerEvent) {
        if self.events.send(event).is_err() {
            debug!("no subscriber for timer event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{RunState, WorkProgress};
    use tokio::sync::broadcast::error::TryRecvError;

    fn seconds(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    fn spawn_actor() -> TimerHandle {
        let (actor, handle) = TimerActor::new(seconds(1));
        tokio::spawn(actor.run());
        handle
    }

    fn short_plan() -> (FocusPlan, Vec<CountdownSegment>) {
        let plan = FocusPlan::new("short", seconds(3), seconds(2));
        let sequence = vec![
            CountdownSegment::Work(seconds(3)),
            CountdownSegment::ShortBreak(seconds(2)),
            CountdownSegment::Work(seconds(1)),
        ];
        (plan, sequence)
    }

    fn drain(events: &mut broadcast::Receiver<TimerEvent>) -> Vec<TimerEvent> {
        let mut received = Vec::new();
        loop {
            match events.try_recv() {
                Ok(event) => received.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        received
    }

    #[tokio::test(start_paused = true)]
    async fn set_plan_does_not_start_counting() {
        let handle = spawn_actor();
        let (plan, sequence) = short_plan();

        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        tokio::time::sleep(seconds(5)).await;

        let status = handle.get_status().await.unwrap();
        assert!(!status.initialised);
        assert_eq!(status.run_state, None);
        assert_eq!(status.total_remaining, seconds(6));
        assert_eq!(status.segment_remaining, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_get_status() {
        let handle = spawn_actor();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();

        let segment = handle.start_next_segment().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(segment, CountdownSegment::Work(seconds(3)));
        let status = handle.get_status().await.unwrap();
        assert!(status.initialised);
        assert!(status.is_running());
        assert_eq!(status.segment_remaining, seconds(2));
        assert_eq!(status.total_remaining, seconds(5));
    }

    #[tokio::test(start_paused = true)]
    async fn segment_end_waits_for_explicit_next() {
        let handle = spawn_actor();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        handle.start_next_segment().await.unwrap();

        tokio::time::sleep(seconds(10)).await;

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.run_state, Some(RunState::SegmentEnded));
        assert_eq!(status.segment_index, Some(0));
        assert_eq!(status.segment_remaining, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn running_every_segment_finishes_session_once() {
        let handle = spawn_actor();
        let mut events = handle.subscribe();
        let (plan, sequence) = short_plan();
        let segment_count = sequence.len();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();

        for _ in 0..segment_count {
            handle.start_next_segment().await.unwrap();
            tokio::time::sleep(seconds(5)).await;
        }

        let status = handle.get_status().await.unwrap();
        assert!(!status.initialised);
        assert_eq!(status.plan_name, None);

        let received = drain(&mut events);
        let finished: Vec<_> = received
            .iter()
            .filter(|event| matches!(event, TimerEvent::SessionFinished { .. }))
            .collect();
        assert_eq!(
            finished,
            vec![&TimerEvent::SessionFinished {
                progress: WorkProgress {
                    completed: 2,
                    total: 2
                }
            }]
        );
        assert!(received.last().is_some_and(TimerEvent::is_terminal));
        assert_eq!(
            handle.start_next_segment().await,
            Err(TimerError::NoSession)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn segment_selected_precedes_first_tick() {
        let handle = spawn_actor();
        let mut events = handle.subscribe();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();

        handle.start_next_segment().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        let received = drain(&mut events);
        assert!(matches!(
            received[0],
            TimerEvent::SegmentSelected { index: 0, .. }
        ));
        assert_eq!(received[1], TimerEvent::RunStateChanged(RunState::Running));
        assert_eq!(
            &received[2..],
            &[
                TimerEvent::SegmentRemainingChanged {
                    segment_remaining: seconds(2),
                    total_remaining: seconds(5),
                },
                TimerEvent::SegmentRemainingChanged {
                    segment_remaining: seconds(1),
                    total_remaining: seconds(4),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_then_resume_preserves_remaining() {
        let handle = spawn_actor();
        let plan = FocusPlan::new("long", seconds(10), seconds(2));
        handle
            .set_plan_and_sequence(plan, vec![CountdownSegment::Work(seconds(10))])
            .await
            .unwrap();
        handle.start_next_segment().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        handle.pause().await.unwrap();
        let paused = handle.get_status().await.unwrap();
        handle.resume().await.unwrap();
        let resumed = handle.get_status().await.unwrap();

        assert_eq!(paused.run_state, Some(RunState::Paused));
        assert_eq!(paused.segment_remaining, seconds(8));
        assert_eq!(resumed.segment_remaining, paused.segment_remaining);
        assert!(resumed.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn paused_timer_does_not_count_down() {
        let handle = spawn_actor();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        handle.start_next_segment().await.unwrap();

        handle.pause().await.unwrap();
        tokio::time::sleep(seconds(30)).await;

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.run_state, Some(RunState::Paused));
        assert_eq!(status.segment_remaining, seconds(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_signals_after_pause_are_ignored() {
        let (actor, handle) = TimerActor::new(seconds(1));
        let stale_sender = actor.signal_sender.clone();
        tokio::spawn(actor.run());

        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        handle.start_next_segment().await.unwrap();
        handle.pause().await.unwrap();
        let mut events = handle.subscribe();

        for generation in 0..2 {
            stale_sender
                .send(CountdownSignal::Tick {
                    generation,
                    remaining: Duration::from_millis(100),
                })
                .unwrap();
            stale_sender
                .send(CountdownSignal::Finished { generation })
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.run_state, Some(RunState::Paused));
        assert_eq!(status.segment_remaining, seconds(3));
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn operations_without_session_report_no_session() {
        let handle = spawn_actor();

        assert_eq!(handle.start_next_segment().await, Err(TimerError::NoSession));
        assert_eq!(handle.pause().await, Err(TimerError::NoSession));
        assert_eq!(handle.resume().await, Err(TimerError::NoSession));
        assert_eq!(handle.delete().await, Err(TimerError::NoSession));

        let status = handle.get_status().await.unwrap();
        assert_eq!(status, TimerSnapshot::idle());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_while_running_is_rejected() {
        let handle = spawn_actor();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        handle.start_next_segment().await.unwrap();

        assert_eq!(handle.resume().await, Err(TimerError::AlreadyRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn delete_cancels_countdown_and_publishes() {
        let handle = spawn_actor();
        let mut events = handle.subscribe();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        handle.start_next_segment().await.unwrap();

        handle.delete().await.unwrap();
        tokio::time::sleep(seconds(10)).await;

        let received = drain(&mut events);
        assert_eq!(received.last(), Some(&TimerEvent::SessionDeleted));
        assert_eq!(handle.get_status().await.unwrap(), TimerSnapshot::idle());
    }

    #[tokio::test(start_paused = true)]
    async fn installing_a_new_session_replaces_the_old_one() {
        let handle = spawn_actor();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();
        handle.start_next_segment().await.unwrap();
        let mut events = handle.subscribe();

        let replacement = FocusPlan::new("replacement", seconds(60), seconds(5));
        handle
            .set_plan_and_sequence(replacement, vec![CountdownSegment::Work(seconds(60))])
            .await
            .unwrap();
        tokio::time::sleep(seconds(10)).await;

        let status = handle.get_status().await.unwrap();
        assert_eq!(status.plan_name.as_deref(), Some("replacement"));
        assert!(!status.initialised);
        assert_eq!(status.total_remaining, seconds(60));
        assert_eq!(drain(&mut events), vec![TimerEvent::SessionDeleted]);
    }

    #[tokio::test(start_paused = true)]
    async fn independent_subscribers_see_same_events() {
        let handle = spawn_actor();
        let mut first = handle.subscribe();
        let mut second = handle.subscribe();
        let (plan, sequence) = short_plan();
        handle.set_plan_and_sequence(plan, sequence).await.unwrap();

        handle.start_next_segment().await.unwrap();
        tokio::time::sleep(seconds(4)).await;

        let first_events = drain(&mut first);
        assert!(!first_events.is_empty());
        assert_eq!(first_events, drain(&mut second));
    }
}
