//! Cadence core library
//!
//! Contains the focus plan model, the sequence generator, the timer session
//! state machine and the port definitions (traits) for plan storage.
//! This crate has no knowledge of infrastructure concerns.

pub mod config;
pub mod domain;
pub mod ports;

pub use config::{Config, ConfigError, NotificationConfig, NotificationUrgency, TimerConfig, TrayConfig};
pub use domain::{
    generate_sequence, whole_seconds, CountdownSegment, FocusPlan, PlanError, RunState,
    TimerAction, TimerError, TimerEvent, TimerSession, TimerSnapshot, WorkProgress,
    POMODORO_PLAN_NAME,
};
pub use ports::{FocusPlanRepository, FocusPlanRepositoryError};
