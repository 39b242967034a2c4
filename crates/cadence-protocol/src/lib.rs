//! Cadence protocol definitions for CLI-daemon communication
//!
//! This crate defines the IPC protocol between the cadence CLI and daemon.
//! All types are serializable with bincode; every message travels as a
//! 4-byte little-endian length prefix followed by the bincode payload.

use serde::{Deserialize, Serialize};

pub use cadence_core::{CountdownSegment, RunState, TimerEvent, TimerSnapshot, WorkProgress};

/// Upper bound on a single frame, guards against garbage length prefixes.
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Longest sequence the daemon accepts. A `Status` or `SessionStarted`
/// frame carrying this many segments stays well below `MAX_FRAME_LENGTH`.
pub const MAX_SEQUENCE_LENGTH: usize = 4096;

/// Requests sent from CLI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Generate a sequence from a plan and start its first segment
    StartSession {
        /// Plan name (None = default plan from config)
        plan: Option<String>,
        /// Total work time in seconds (None = default from config)
        total_work_seconds: Option<u64>,
    },
    /// Start the next segment of the sequence
    NextSegment,
    /// Pause the running segment
    PauseSession,
    /// Resume a paused segment
    ResumeSession,
    /// Cancel and discard the current session
    DeleteSession,
    /// Get current session status
    GetStatus,
    /// Generate a sequence without starting anything
    PreviewSequence {
        plan: Option<String>,
        total_work_seconds: Option<u64>,
    },
    /// Keep the connection open and stream timer events
    Subscribe,
    /// Ping the daemon to check if it's alive
    Ping,
}

/// Responses sent from daemon to CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// A session was installed and its first segment started
    SessionStarted {
        plan_name: String,
        sequence: Vec<CountdownSegment>,
    },
    /// A generated sequence that was not started
    Sequence {
        plan_name: String,
        sequence: Vec<CountdownSegment>,
    },
    /// Session status information
    Status(TimerSnapshot),
    /// One event of a subscription stream
    Event(TimerEvent),
    /// Generic success acknowledgment
    Ok,
    /// Error response with message
    Error { message: String },
    /// Pong response to ping
    Pong,
}

pub fn encode_frame<T: Serialize>(message: &T) -> bincode::Result<Vec<u8>> {
    let payload = bincode::serialize(message)?;
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn frame_length(prefix: [u8; 4]) -> Option<usize> {
    let length = u32::from_le_bytes(prefix) as usize;
    (length <= MAX_FRAME_LENGTH).then_some(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn request_start_session_serialization() {
        let request = Request::StartSession {
            plan: Some("POMODORO".to_string()),
            total_work_seconds: Some(130 * 60),
        };

        let bytes = bincode::serialize(&request).unwrap();
        let decoded: Request = bincode::deserialize(&bytes).unwrap();

        assert_eq!(request, decoded);
    }

    #[test]
    fn request_start_session_with_defaults() {
        let request = Request::StartSession {
            plan: None,
            total_work_seconds: None,
        };

        let bytes = bincode::serialize(&request).unwrap();
        let decoded: Request = bincode::deserialize(&bytes).unwrap();

        assert_eq!(request, decoded);
    }

    #[test]
    fn response_status_carries_full_snapshot() {
        let snapshot = TimerSnapshot {
            initialised: true,
            run_state: Some(RunState::Paused),
            plan_name: Some("POMODORO".to_string()),
            segment_index: Some(1),
            current_segment: Some(CountdownSegment::ShortBreak(Duration::from_secs(300))),
            segment_remaining: Duration::from_millis(123_456),
            total_remaining: Duration::from_secs(4_000),
            work_progress: WorkProgress {
                completed: 1,
                total: 3,
            },
            sequence: vec![
                CountdownSegment::Work(Duration::from_secs(1_200)),
                CountdownSegment::ShortBreak(Duration::from_secs(300)),
            ],
            started_at: Some(chrono::Utc::now()),
        };
        let response = Response::Status(snapshot);

        let bytes = bincode::serialize(&response).unwrap();
        let decoded: Response = bincode::deserialize(&bytes).unwrap();

        assert_eq!(response, decoded);
    }

    #[test]
    fn event_response_serialization() {
        let response = Response::Event(TimerEvent::SegmentSelected {
            index: 2,
            segment: CountdownSegment::Work(Duration::from_secs(1_200)),
            progress: WorkProgress {
                completed: 1,
                total: 7,
            },
        });

        let bytes = bincode::serialize(&response).unwrap();
        let decoded: Response = bincode::deserialize(&bytes).unwrap();

        assert_eq!(response, decoded);
    }

    #[test]
    fn frame_has_little_endian_length_prefix() {
        let frame = encode_frame(&Request::Ping).unwrap();

        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&frame[..4]);

        assert_eq!(frame_length(prefix), Some(frame.len() - 4));
        let decoded: Request = bincode::deserialize(&frame[4..]).unwrap();
        assert_eq!(decoded, Request::Ping);
    }

    #[test]
    fn longest_accepted_sequence_fits_in_one_frame() {
        let sequence = vec![CountdownSegment::LongBreak(Duration::MAX); MAX_SEQUENCE_LENGTH];
        let snapshot = TimerSnapshot {
            initialised: true,
            run_state: Some(RunState::Running),
            plan_name: Some("x".repeat(256)),
            segment_index: Some(MAX_SEQUENCE_LENGTH - 1),
            current_segment: sequence.last().copied(),
            segment_remaining: Duration::MAX,
            total_remaining: Duration::MAX,
            work_progress: WorkProgress {
                completed: MAX_SEQUENCE_LENGTH,
                total: MAX_SEQUENCE_LENGTH,
            },
            sequence: sequence.clone(),
            started_at: Some(chrono::Utc::now()),
        };

        let status = encode_frame(&Response::Status(snapshot)).unwrap();
        let started = encode_frame(&Response::SessionStarted {
            plan_name: "x".repeat(256),
            sequence,
        })
        .unwrap();

        assert!(status.len() - 4 <= MAX_FRAME_LENGTH);
        assert!(started.len() - 4 <= MAX_FRAME_LENGTH);
    }

    #[test]
    fn oversized_frame_length_is_rejected() {
        let prefix = ((MAX_FRAME_LENGTH + 1) as u32).to_le_bytes();
        assert_eq!(frame_length(prefix), None);
    }
}
