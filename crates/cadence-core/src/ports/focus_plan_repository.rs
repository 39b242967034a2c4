use thiserror::Error;

use crate::domain::{FocusPlan, PlanError};

#[derive(Error, Debug)]
pub enum FocusPlanRepositoryError {
    #[error("focus plan not found: {name}")]
    NotFound { name: String },

    #[error("a focus plan named `{name}` already exists")]
    AlreadyExists { name: String },

    #[error("invalid focus plan: {0}")]
    Invalid(#[from] PlanError),

    #[error("storage error: {message}")]
    Storage { message: String },
}

pub trait FocusPlanRepository: Send + Sync {
    fn insert(&self, plan: &FocusPlan) -> Result<(), FocusPlanRepositoryError>;

    fn update(&self, plan: &FocusPlan) -> Result<(), FocusPlanRepositoryError>;

    fn delete(&self, name: &str) -> Result<(), FocusPlanRepositoryError>;

    fn find_all(&self) -> Result<Vec<FocusPlan>, FocusPlanRepositoryError>;

    fn find_by_name(&self, name: &str) -> Result<Option<FocusPlan>, FocusPlanRepositoryError>;
}
