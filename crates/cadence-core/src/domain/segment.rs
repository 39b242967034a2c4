use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownSegment {
    Work(Duration),
    ShortBreak(Duration),
    LongBreak(Duration),
}

impl CountdownSegment {
    pub fn duration(&self) -> Duration {
        match self {
            CountdownSegment::Work(duration)
            | CountdownSegment::ShortBreak(duration)
            | CountdownSegment::LongBreak(duration) => *duration,
        }
    }

    pub fn is_work(&self) -> bool {
        matches!(self, CountdownSegment::Work(_))
    }

    pub fn is_break(&self) -> bool {
        !self.is_work()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CountdownSegment::Work(_) => "work",
            CountdownSegment::ShortBreak(_) => "short-break",
            CountdownSegment::LongBreak(_) => "long-break",
        }
    }

    /// Headline shown by notification surfaces while the segment runs.
    pub fn headline(&self) -> &'static str {
        if self.is_work() {
            "Working"
        } else {
            "Break Time"
        }
    }
}

impl fmt::Display for CountdownSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}s)", self.as_str(), self.duration().as_secs())
    }
}

pub fn total_duration(sequence: &[CountdownSegment]) -> Duration {
    sequence.iter().map(CountdownSegment::duration).sum()
}

/// Whole seconds of `duration`, rounded to the nearest second.
///
/// Countdown ticks land a little after their interval, so flooring would
/// report one second less than the clock the user is watching.
pub fn whole_seconds(duration: Duration) -> u64 {
    duration.saturating_add(Duration::from_millis(500)).as_secs()
}

pub fn work_segment_count(sequence: &[CountdownSegment]) -> usize {
    sequence.iter().filter(|segment| segment.is_work()).count()
}
