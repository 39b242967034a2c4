use std::sync::Arc;
use std::time::Duration;

use cadence_core::{
    generate_sequence, CountdownSegment, FocusPlan, FocusPlanRepository,
    FocusPlanRepositoryError, PlanError, TimerConfig, POMODORO_PLAN_NAME,
};
use cadence_protocol::MAX_SEQUENCE_LENGTH;
use thiserror::Error;
use tracing::{debug, warn};

/// Longest total work time a single session may request.
pub const MAX_TOTAL_WORK_TIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug)]
pub enum PlanLookupError {
    #[error("unknown focus plan: {name}")]
    UnknownPlan { name: String },

    #[error("total work time of {requested_seconds}s exceeds the {max_seconds}s limit")]
    TotalWorkTimeTooLong {
        requested_seconds: u64,
        max_seconds: u64,
    },

    #[error("plan `{name}` would expand into {segments} segments, the limit is {max}")]
    SequenceTooLong {
        name: String,
        segments: u128,
        max: usize,
    },

    #[error(transparent)]
    Repository(#[from] FocusPlanRepositoryError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Resolves plan names to plans and expands them into sequences.
///
/// Stored plans win over the built-in preset, so a user can shadow
/// `POMODORO` with their own durations.
#[derive(Clone)]
pub struct PlanCatalog {
    repository: Option<Arc<dyn FocusPlanRepository>>,
    default_plan: String,
    default_total_work_time: Duration,
}

impl PlanCatalog {
    pub fn new(repository: Option<Arc<dyn FocusPlanRepository>>, config: &TimerConfig) -> Self {
        Self {
            repository,
            default_plan: config.default_plan.clone(),
            default_total_work_time: config.default_total_work_time(),
        }
    }

    pub fn resolve(&self, name: Option<&str>) -> Result<FocusPlan, PlanLookupError> {
        let name = name.unwrap_or(&self.default_plan);

        if let Some(repository) = &self.repository {
            if let Some(plan) = repository.find_by_name(name)? {
                debug!(name, "plan resolved from storage");
                return Ok(plan);
            }
        }

        if name == POMODORO_PLAN_NAME {
            return Ok(FocusPlan::pomodoro());
        }

        Err(PlanLookupError::UnknownPlan {
            name: name.to_string(),
        })
    }

    pub fn prepare(
        &self,
        name: Option<&str>,
        total_work_seconds: Option<u64>,
    ) -> Result<(FocusPlan, Vec<CountdownSegment>), PlanLookupError> {
        let plan = self.resolve(name)?;
        let total_work_time = total_work_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_total_work_time);

        check_bounds(&plan, total_work_time)?;

        let sequence = generate_sequence(&plan, total_work_time)?;
        Ok((plan, sequence))
    }
}

/// Rejects requests whose sequence would not fit in a protocol frame,
/// before anything is allocated.
fn check_bounds(plan: &FocusPlan, total_work_time: Duration) -> Result<(), PlanLookupError> {
    if total_work_time > MAX_TOTAL_WORK_TIME {
        warn!(
            requested = total_work_time.as_secs(),
            "rejected oversized total work time"
        );
        return Err(PlanLookupError::TotalWorkTimeTooLong {
            requested_seconds: total_work_time.as_secs(),
            max_seconds: MAX_TOTAL_WORK_TIME.as_secs(),
        });
    }

    plan.validate_for_sequence()?;

    let work_segments = total_work_time
        .as_nanos()
        .div_ceil(plan.work_duration.as_nanos())
        .max(1);
    let segments = work_segments * 2 - 1;
    if segments > MAX_SEQUENCE_LENGTH as u128 {
        warn!(plan = %plan.name, segments, "rejected oversized sequence");
        return Err(PlanLookupError::SequenceTooLong {
            name: plan.name.clone(),
            segments,
            max: MAX_SEQUENCE_LENGTH,
        });
    }

    Ok(())
}
