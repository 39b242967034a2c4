use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use cadence_core::{FocusPlan, FocusPlanRepository, FocusPlanRepositoryError};

pub struct SqliteFocusPlanRepository {
    connection: Mutex<Connection>,
}

impl SqliteFocusPlanRepository {
    pub fn new(path: &Path) -> Result<Self, FocusPlanRepositoryError> {
        let connection = Connection::open(path).map_err(storage_error)?;

        let repository = Self {
            connection: Mutex::new(connection),
        };
        repository.initialize_schema()?;

        Ok(repository)
    }

    pub fn in_memory() -> Result<Self, FocusPlanRepositoryError> {
        let connection = Connection::open_in_memory().map_err(storage_error)?;

        let repository = Self {
            connection: Mutex::new(connection),
        };
        repository.initialize_schema()?;

        Ok(repository)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, FocusPlanRepositoryError> {
        self.connection
            .lock()
            .map_err(|_| FocusPlanRepositoryError::Storage {
                message: "connection mutex poisoned".to_string(),
            })
    }

    fn initialize_schema(&self) -> Result<(), FocusPlanRepositoryError> {
        let connection = self.lock()?;
        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS focus_plans (
                    name TEXT PRIMARY KEY,
                    work_millis INTEGER NOT NULL,
                    short_break_millis INTEGER NOT NULL,
                    long_break_millis INTEGER,
                    cycles INTEGER
                );",
            )
            .map_err(storage_error)
    }
}

impl FocusPlanRepository for SqliteFocusPlanRepository {
    fn insert(&self, plan: &FocusPlan) -> Result<(), FocusPlanRepositoryError> {
        plan.validate()?;

        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO focus_plans (name, work_millis, short_break_millis, long_break_millis, cycles)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    plan.name,
                    to_millis(plan.work_duration),
                    to_millis(plan.short_break_duration),
                    plan.long_break_duration.map(to_millis),
                    plan.cycles,
                ],
            )
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(failure, _)
                    if failure.code == ErrorCode::ConstraintViolation =>
                {
                    FocusPlanRepositoryError::AlreadyExists {
                        name: plan.name.clone(),
                    }
                }
                other => storage_error(other),
            })?;

        debug!(name = %plan.name, "focus plan inserted");
        Ok(())
    }

    fn update(&self, plan: &FocusPlan) -> Result<(), FocusPlanRepositoryError> {
        plan.validate()?;

        let connection = self.lock()?;
        let rows_affected = connection
            .execute(
                "UPDATE focus_plans
                 SET work_millis = ?1, short_break_millis = ?2, long_break_millis = ?3, cycles = ?4
                 WHERE name = ?5",
                params![
                    to_millis(plan.work_duration),
                    to_millis(plan.short_break_duration),
                    plan.long_break_duration.map(to_millis),
                    plan.cycles,
                    plan.name,
                ],
            )
            .map_err(storage_error)?;

        if rows_affected == 0 {
            return Err(FocusPlanRepositoryError::NotFound {
                name: plan.name.clone(),
            });
        }

        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), FocusPlanRepositoryError> {
        let connection = self.lock()?;
        let rows_affected = connection
            .execute("DELETE FROM focus_plans WHERE name = ?1", params![name])
            .map_err(storage_error)?;

        if rows_affected == 0 {
            return Err(FocusPlanRepositoryError::NotFound {
                name: name.to_string(),
            });
        }

        Ok(())
    }

    fn find_all(&self) -> Result<Vec<FocusPlan>, FocusPlanRepositoryError> {
        let connection = self.lock()?;

        let mut statement = connection
            .prepare(
                "SELECT name, work_millis, short_break_millis, long_break_millis, cycles
                 FROM focus_plans ORDER BY name",
            )
            .map_err(storage_error)?;

        let plans = statement
            .query_map([], row_to_plan)
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;

        Ok(plans)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<FocusPlan>, FocusPlanRepositoryError> {
        let connection = self.lock()?;

        connection
            .query_row(
                "SELECT name, work_millis, short_break_millis, long_break_millis, cycles
                 FROM focus_plans WHERE name = ?1",
                params![name],
                row_to_plan,
            )
            .optional()
            .map_err(storage_error)
    }
}

fn storage_error(error: rusqlite::Error) -> FocusPlanRepositoryError {
    FocusPlanRepositoryError::Storage {
        message: error.to_string(),
    }
}

fn to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn from_millis(value: i64) -> Duration {
    Duration::from_millis(value.max(0) as u64)
}

fn row_to_plan(row: &rusqlite::Row) -> rusqlite::Result<FocusPlan> {
    let long_break_millis: Option<i64> = row.get(3)?;

    Ok(FocusPlan {
        name: row.get(0)?,
        work_duration: from_millis(row.get(1)?),
        short_break_duration: from_millis(row.get(2)?),
        long_break_duration: long_break_millis.map(from_millis),
        cycles: row.get(4)?,
    })
}
