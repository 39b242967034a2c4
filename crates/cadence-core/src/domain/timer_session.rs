use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::segment::{total_duration, whole_seconds, work_segment_count};
use super::{CountdownSegment, FocusPlan};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("no session is active")]
    NoSession,

    #[error("the timer is already running")]
    AlreadyRunning,

    #[error("the timer is not running")]
    NotRunning,

    #[error("the timer is not paused")]
    NotPaused,

    #[error("no segment left in the sequence")]
    SequenceExhausted,

    #[error("the timer service is unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Paused,
    SegmentEnded,
}

/// The action a surface should offer for a given run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    Pause,
    Resume,
    NextSegment,
}

impl RunState {
    pub fn available_action(&self) -> TimerAction {
        match self {
            RunState::Running => TimerAction::Pause,
            RunState::Paused => TimerAction::Resume,
            RunState::SegmentEnded => TimerAction::NextSegment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::SegmentEnded => "segment-ended",
        }
    }
}

impl TimerAction {
    pub fn label(&self) -> &'static str {
        match self {
            TimerAction::Pause => "Pause",
            TimerAction::Resume => "Resume",
            TimerAction::NextSegment => "Next",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkProgress {
    pub completed: usize,
    pub total: usize,
}

impl fmt::Display for WorkProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    SegmentSelected {
        index: usize,
        segment: CountdownSegment,
        progress: WorkProgress,
    },
    SegmentRemainingChanged {
        segment_remaining: Duration,
        total_remaining: Duration,
    },
    RunStateChanged(RunState),
    SessionFinished {
        progress: WorkProgress,
    },
    SessionDeleted,
}

impl TimerEvent {
    /// Terminal events close a session; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TimerEvent::SessionFinished { .. } | TimerEvent::SessionDeleted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub initialised: bool,
    pub run_state: Option<RunState>,
    pub plan_name: Option<String>,
    pub segment_index: Option<usize>,
    pub current_segment: Option<CountdownSegment>,
    pub segment_remaining: Duration,
    pub total_remaining: Duration,
    pub work_progress: WorkProgress,
    pub sequence: Vec<CountdownSegment>,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerSnapshot {
    pub fn idle() -> Self {
        Self {
            initialised: false,
            run_state: None,
            plan_name: None,
            segment_index: None,
            current_segment: None,
            segment_remaining: Duration::ZERO,
            total_remaining: Duration::ZERO,
            work_progress: WorkProgress::default(),
            sequence: Vec::new(),
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state == Some(RunState::Running)
    }
}

/// State of one focus session, advanced by commands and countdown ticks.
///
/// Every mutating method returns the events observers must see, in order.
/// The session never touches a clock; remaining times only move when
/// [`TimerSession::record_tick`] or [`TimerSession::finish_segment`] is called.
#[derive(Debug, Clone)]
pub struct TimerSession {
    plan: FocusPlan,
    sequence: Vec<CountdownSegment>,
    index: Option<usize>,
    segment_remaining: Duration,
    total_remaining: Duration,
    run_state: Option<RunState>,
    work_progress: WorkProgress,
    last_published_seconds: Option<u64>,
    started_at: DateTime<Utc>,
    complete: bool,
}

impl TimerSession {
    pub fn new(plan: FocusPlan, sequence: Vec<CountdownSegment>) -> Self {
        let total_remaining = total_duration(&sequence);
        let work_progress = WorkProgress {
            completed: 0,
            total: work_segment_count(&sequence),
        };

        Self {
            plan,
            sequence,
            index: None,
            segment_remaining: Duration::ZERO,
            total_remaining,
            run_state: None,
            work_progress,
            last_published_seconds: None,
            started_at: Utc::now(),
            complete: false,
        }
    }

    pub fn plan(&self) -> &FocusPlan {
        &self.plan
    }

    pub fn sequence(&self) -> &[CountdownSegment] {
        &self.sequence
    }

    pub fn segment_index(&self) -> Option<usize> {
        self.index
    }

    pub fn current_segment(&self) -> Option<CountdownSegment> {
        self.index.map(|index| self.sequence[index])
    }

    pub fn segment_remaining(&self) -> Duration {
        self.segment_remaining
    }

    pub fn total_remaining(&self) -> Duration {
        self.total_remaining
    }

    pub fn run_state(&self) -> Option<RunState> {
        self.run_state
    }

    pub fn work_progress(&self) -> WorkProgress {
        self.work_progress
    }

    pub fn is_initialised(&self) -> bool {
        self.index.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.run_state == Some(RunState::Running)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn has_next_segment(&self) -> bool {
        let next = self.index.map_or(0, |index| index + 1);
        next < self.sequence.len()
    }

    pub fn start_next_segment(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        if !self.has_next_segment() {
            return Err(TimerError::SequenceExhausted);
        }

        if self.current_segment().is_some_and(|segment| segment.is_work()) {
            self.work_progress.completed += 1;
        }

        // Whatever the leaving segment had not counted down is skipped time.
        self.total_remaining = self.total_remaining.saturating_sub(self.segment_remaining);

        let index = self.index.map_or(0, |index| index + 1);
        let segment = self.sequence[index];
        self.index = Some(index);
        self.segment_remaining = segment.duration();
        self.last_published_seconds = Some(whole_seconds(segment.duration()));
        self.run_state = Some(RunState::Running);

        Ok(vec![
            TimerEvent::SegmentSelected {
                index,
                segment,
                progress: self.work_progress,
            },
            TimerEvent::RunStateChanged(RunState::Running),
        ])
    }

    pub fn pause(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        match self.run_state {
            Some(RunState::Running) => {
                self.run_state = Some(RunState::Paused);
                Ok(vec![TimerEvent::RunStateChanged(RunState::Paused)])
            }
            Some(RunState::Paused) => Ok(Vec::new()),
            Some(RunState::SegmentEnded) | None => Err(TimerError::NotRunning),
        }
    }

    pub fn resume(&mut self) -> Result<Vec<TimerEvent>, TimerError> {
        match self.run_state {
            Some(RunState::Paused) => {
                self.run_state = Some(RunState::Running);
                Ok(vec![TimerEvent::RunStateChanged(RunState::Running)])
            }
            Some(RunState::Running) => Err(TimerError::AlreadyRunning),
            Some(RunState::SegmentEnded) | None => Err(TimerError::NotPaused),
        }
    }

    /// Applies a countdown tick; returns an event only when the whole-second
    /// value of the segment's remaining time changes.
    pub fn record_tick(&mut self, remaining: Duration) -> Option<TimerEvent> {
        if !self.is_running() || remaining > self.segment_remaining {
            return None;
        }

        let delta = self.segment_remaining - remaining;
        self.segment_remaining = remaining;
        self.total_remaining = self.total_remaining.saturating_sub(delta);

        let seconds = whole_seconds(remaining);
        if self.last_published_seconds == Some(seconds) {
            return None;
        }
        self.last_published_seconds = Some(seconds);

        Some(TimerEvent::SegmentRemainingChanged {
            segment_remaining: self.segment_remaining,
            total_remaining: self.total_remaining,
        })
    }

    /// Closes the current segment after its countdown ran out.
    pub fn finish_segment(&mut self) -> Vec<TimerEvent> {
        if !self.is_running() {
            return Vec::new();
        }

        let mut events: Vec<TimerEvent> = self.record_tick(Duration::ZERO).into_iter().collect();

        if self.has_next_segment() {
            self.run_state = Some(RunState::SegmentEnded);
            events.push(TimerEvent::RunStateChanged(RunState::SegmentEnded));
        } else {
            if self.current_segment().is_some_and(|segment| segment.is_work()) {
                self.work_progress.completed += 1;
            }
            self.complete = true;
            events.push(TimerEvent::SessionFinished {
                progress: self.work_progress,
            });
        }

        events
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            initialised: self.is_initialised(),
            run_state: self.run_state,
            plan_name: Some(self.plan.name.clone()),
            segment_index: self.index,
            current_segment: self.current_segment(),
            segment_remaining: self.segment_remaining,
            total_remaining: self.total_remaining,
            work_progress: self.work_progress,
            sequence: self.sequence.clone(),
            started_at: Some(self.started_at),
        }
    }
}
