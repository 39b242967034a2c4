use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const POMODORO_PLAN_NAME: &str = "POMODORO";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("plan name must not be blank")]
    BlankName,

    #[error("plan `{name}`: work duration must be greater than zero")]
    ZeroWorkDuration { name: String },

    #[error("plan `{name}`: short break duration must be greater than zero")]
    ZeroShortBreak { name: String },

    #[error("plan `{name}`: cycles must be greater than zero when set")]
    ZeroCycles { name: String },

    #[error("plan `{name}` sets cycles but no long break duration")]
    MissingLongBreak { name: String },
}

/// Template used to expand a total work time into a sequence of segments.
///
/// When `cycles` is set, every `cycles`-th work segment is followed by a long
/// break instead of a short one, so `long_break_duration` must be set too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPlan {
    pub name: String,
    pub work_duration: Duration,
    pub short_break_duration: Duration,
    pub long_break_duration: Option<Duration>,
    pub cycles: Option<u32>,
}

impl FocusPlan {
    pub fn new(
        name: impl Into<String>,
        work_duration: Duration,
        short_break_duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            work_duration,
            short_break_duration,
            long_break_duration: None,
            cycles: None,
        }
    }

    pub fn with_long_break(mut self, long_break_duration: Duration, cycles: u32) -> Self {
        self.long_break_duration = Some(long_break_duration);
        self.cycles = Some(cycles);
        self
    }

    pub fn pomodoro() -> Self {
        Self::new(
            POMODORO_PLAN_NAME,
            Duration::from_secs(20 * 60),
            Duration::from_secs(5 * 60),
        )
        .with_long_break(Duration::from_secs(15 * 60), 4)
    }

    pub fn is_builtin(&self) -> bool {
        self.name == POMODORO_PLAN_NAME
    }

    /// Full validation applied before a plan is stored.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.name.trim().is_empty() {
            return Err(PlanError::BlankName);
        }
        if self.short_break_duration.is_zero() {
            return Err(PlanError::ZeroShortBreak {
                name: self.name.clone(),
            });
        }
        self.validate_for_sequence()
    }

    /// The subset of invariants the sequence generator depends on.
    pub fn validate_for_sequence(&self) -> Result<(), PlanError> {
        if self.work_duration.is_zero() {
            return Err(PlanError::ZeroWorkDuration {
                name: self.name.clone(),
            });
        }
        match (self.cycles, self.long_break_duration) {
            (Some(0), _) => Err(PlanError::ZeroCycles {
                name: self.name.clone(),
            }),
            (Some(_), None) => Err(PlanError::MissingLongBreak {
                name: self.name.clone(),
            }),
            _ => Ok(()),
        }
    }
}

impl Default for FocusPlan {
    fn default() -> Self {
        Self::pomodoro()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(value: u64) -> Duration {
        Duration::from_secs(value * 60)
    }

    #[test]
    fn pomodoro_preset_matches_classic_values() {
        let plan = FocusPlan::pomodoro();

        assert_eq!(plan.name, "POMODORO");
        assert_eq!(plan.work_duration, minutes(20));
        assert_eq!(plan.short_break_duration, minutes(5));
        assert_eq!(plan.long_break_duration, Some(minutes(15)));
        assert_eq!(plan.cycles, Some(4));
        assert!(plan.is_builtin());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn plan_without_cycles_is_valid() {
        let plan = FocusPlan::new("simple", minutes(50), minutes(10));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let plan = FocusPlan::new("   ", minutes(25), minutes(5));
        assert_eq!(plan.validate(), Err(PlanError::BlankName));
    }

    #[test]
    fn zero_work_duration_is_rejected() {
        let plan = FocusPlan::new("broken", Duration::ZERO, minutes(5));
        assert!(matches!(
            plan.validate(),
            Err(PlanError::ZeroWorkDuration { .. })
        ));
    }

    #[test]
    fn zero_short_break_is_rejected_for_storage_only() {
        let plan = FocusPlan::new("no-break", minutes(25), Duration::ZERO);

        assert!(matches!(
            plan.validate(),
            Err(PlanError::ZeroShortBreak { .. })
        ));
        assert!(plan.validate_for_sequence().is_ok());
    }

    #[test]
    fn cycles_without_long_break_are_rejected() {
        let mut plan = FocusPlan::new("half", minutes(25), minutes(5));
        plan.cycles = Some(3);

        assert_eq!(
            plan.validate_for_sequence(),
            Err(PlanError::MissingLongBreak {
                name: "half".to_string()
            })
        );
    }

    #[test]
    fn zero_cycles_are_rejected() {
        let plan = FocusPlan::new("zero", minutes(25), minutes(5)).with_long_break(minutes(15), 0);

        assert!(matches!(
            plan.validate_for_sequence(),
            Err(PlanError::ZeroCycles { .. })
        ));
    }

    #[test]
    fn long_break_without_cycles_is_ignored() {
        let mut plan = FocusPlan::new("lenient", minutes(25), minutes(5));
        plan.long_break_duration = Some(minutes(20));

        assert!(plan.validate().is_ok());
    }
}
