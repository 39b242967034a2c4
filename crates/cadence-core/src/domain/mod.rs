mod focus_plan;
pub mod segment;
mod sequence;
mod timer_session;

pub use focus_plan::{FocusPlan, PlanError, POMODORO_PLAN_NAME};
pub use segment::{whole_seconds, CountdownSegment};
pub use sequence::generate_sequence;
pub use timer_session::{
    RunState, TimerAction, TimerError, TimerEvent, TimerSession, TimerSnapshot, WorkProgress,
};
