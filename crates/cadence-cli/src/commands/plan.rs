use anyhow::{bail, Context, Result};
use cadence_adapters::SqliteFocusPlanRepository;
use cadence_core::{Config, FocusPlan, FocusPlanRepository, FocusPlanRepositoryError};
use clap::Subcommand;
use dialoguer::{Confirm, Input};
use std::time::Duration;

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// List stored plans and the built-in preset
    List,
    /// Show one plan
    Show {
        /// Plan name
        name: String,
    },
    /// Store a new plan (prompts for missing durations)
    Add {
        /// Plan name
        name: String,
        /// Work segment length in minutes
        #[arg(long)]
        work: Option<u64>,
        /// Short break length in minutes
        #[arg(long)]
        short_break: Option<u64>,
        /// Long break length in minutes
        #[arg(long, requires = "cycles")]
        long_break: Option<u64>,
        /// Work segments before a long break
        #[arg(long, requires = "long_break")]
        cycles: Option<u32>,
    },
    /// Change the durations of a plan (prompts when no option is given)
    ///
    /// Editing the built-in preset stores a copy that shadows it.
    Edit {
        /// Plan name
        name: String,
        /// Work segment length in minutes
        #[arg(long)]
        work: Option<u64>,
        /// Short break length in minutes
        #[arg(long)]
        short_break: Option<u64>,
        /// Long break length in minutes
        #[arg(long, conflicts_with = "no_long_break")]
        long_break: Option<u64>,
        /// Work segments before a long break
        #[arg(long, conflicts_with = "no_long_break")]
        cycles: Option<u32>,
        /// Drop the long break from the plan
        #[arg(long)]
        no_long_break: bool,
    },
    /// Delete a stored plan
    Remove {
        /// Plan name
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn execute(command: PlanCommand) -> Result<()> {
    let repository = open_repository()?;

    match command {
        PlanCommand::List => {
            for plan in list_plans(&repository)? {
                println!("{}", describe_plan(&plan));
            }
        }
        PlanCommand::Show { name } => {
            let plan = find_plan(&repository, &name)?
                .with_context(|| format!("unknown focus plan: {}", name))?;
            println!("{}", describe_plan(&plan));
        }
        PlanCommand::Add {
            name,
            work,
            short_break,
            long_break,
            cycles,
        } => {
            let work = prompt_if_missing(work, "Work segment length (minutes)")?;
            let short_break = prompt_if_missing(short_break, "Short break length (minutes)")?;

            let mut plan = FocusPlan::new(name, from_minutes(work)?, from_minutes(short_break)?);
            if let (Some(long_break), Some(cycles)) = (long_break, cycles) {
                plan = plan.with_long_break(from_minutes(long_break)?, cycles);
            }

            match repository.insert(&plan) {
                Ok(()) => println!("Plan {} saved", plan.name),
                Err(FocusPlanRepositoryError::AlreadyExists { name }) => {
                    bail!("a plan named {} already exists", name)
                }
                Err(error) => bail!("{}", error),
            }
        }
        PlanCommand::Edit {
            name,
            work,
            short_break,
            long_break,
            cycles,
            no_long_break,
        } => {
            let current = find_plan(&repository, &name)?
                .with_context(|| format!("unknown focus plan: {}", name))?;

            let mut edits = PlanEdits {
                work,
                short_break,
                long_break,
                cycles,
                drop_long_break: no_long_break,
            };
            if edits.is_empty() {
                edits = prompt_edits(&current)?;
            }

            let plan = apply_edits(current, &edits)?;
            save_plan(&repository, &plan)?;
            println!("{}", describe_plan(&plan));
        }
        PlanCommand::Remove { name, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete plan {}?", name))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("Cancelled");
                    return Ok(());
                }
            }

            match repository.delete(&name) {
                Ok(()) => println!("Plan {} deleted", name),
                Err(FocusPlanRepositoryError::NotFound { .. }) => {
                    bail!("no stored plan named {}", name)
                }
                Err(error) => bail!("{}", error),
            }
        }
    }

    Ok(())
}

fn open_repository() -> Result<SqliteFocusPlanRepository> {
    let database_path = Config::plans_database_path().context("cannot find data directory")?;

    if let Some(data_dir) = database_path.parent() {
        std::fs::create_dir_all(data_dir).context("cannot create data directory")?;
    }

    SqliteFocusPlanRepository::new(&database_path)
        .map_err(|error| anyhow::anyhow!("database access error: {}", error))
}

/// Stored plans sorted by name, plus the built-in preset unless a stored plan shadows it.
fn list_plans(repository: &dyn FocusPlanRepository) -> Result<Vec<FocusPlan>> {
    let mut plans = repository.find_all()?;

    if !plans.iter().any(FocusPlan::is_builtin) {
        plans.insert(0, FocusPlan::pomodoro());
    }

    Ok(plans)
}

fn find_plan(repository: &dyn FocusPlanRepository, name: &str) -> Result<Option<FocusPlan>> {
    let stored = repository.find_by_name(name)?;
    let builtin = FocusPlan::pomodoro();

    Ok(stored.or_else(|| (builtin.name == name).then_some(builtin)))
}

/// Requested changes to a plan, in minutes.
#[derive(Debug, Default)]
struct PlanEdits {
    work: Option<u64>,
    short_break: Option<u64>,
    long_break: Option<u64>,
    cycles: Option<u32>,
    drop_long_break: bool,
}

impl PlanEdits {
    fn is_empty(&self) -> bool {
        self.work.is_none()
            && self.short_break.is_none()
            && self.long_break.is_none()
            && self.cycles.is_none()
            && !self.drop_long_break
    }
}

fn apply_edits(mut plan: FocusPlan, edits: &PlanEdits) -> Result<FocusPlan> {
    if let Some(work) = edits.work {
        plan.work_duration = from_minutes(work)?;
    }
    if let Some(short_break) = edits.short_break {
        plan.short_break_duration = from_minutes(short_break)?;
    }

    if edits.drop_long_break {
        plan.long_break_duration = None;
        plan.cycles = None;
    } else {
        if let Some(long_break) = edits.long_break {
            plan.long_break_duration = Some(from_minutes(long_break)?);
        }
        if let Some(cycles) = edits.cycles {
            plan.cycles = Some(cycles);
        }
        if plan.long_break_duration.is_some() != plan.cycles.is_some() {
            bail!("a long break needs both --long-break and --cycles");
        }
    }

    plan.validate()?;
    Ok(plan)
}

/// Asks for every duration, offering the current values as defaults.
fn prompt_edits(plan: &FocusPlan) -> Result<PlanEdits> {
    let work = Input::new()
        .with_prompt("Work segment length (minutes)")
        .default(plan.work_duration.as_secs() / 60)
        .interact_text()?;
    let short_break = Input::new()
        .with_prompt("Short break length (minutes)")
        .default(plan.short_break_duration.as_secs() / 60)
        .interact_text()?;

    let keep_long_break = Confirm::new()
        .with_prompt("Use a long break?")
        .default(plan.cycles.is_some())
        .interact()?;
    if !keep_long_break {
        return Ok(PlanEdits {
            work: Some(work),
            short_break: Some(short_break),
            drop_long_break: true,
            ..Default::default()
        });
    }

    let long_break = Input::new()
        .with_prompt("Long break length (minutes)")
        .default(plan.long_break_duration.map_or(15, |duration| duration.as_secs() / 60))
        .interact_text()?;
    let cycles = Input::new()
        .with_prompt("Work segments before a long break")
        .default(plan.cycles.unwrap_or(4))
        .interact_text()?;

    Ok(PlanEdits {
        work: Some(work),
        short_break: Some(short_break),
        long_break: Some(long_break),
        cycles: Some(cycles),
        drop_long_break: false,
    })
}

/// Updates a stored plan, or stores the edited built-in preset as a new one.
fn save_plan(repository: &dyn FocusPlanRepository, plan: &FocusPlan) -> Result<()> {
    match repository.update(plan) {
        Ok(()) => Ok(()),
        Err(FocusPlanRepositoryError::NotFound { .. }) if plan.is_builtin() => {
            repository.insert(plan)?;
            Ok(())
        }
        Err(error) => bail!("{}", error),
    }
}

fn prompt_if_missing(value: Option<u64>, prompt: &str) -> Result<u64> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

fn from_minutes(value: u64) -> Result<Duration> {
    match value.checked_mul(60) {
        Some(seconds) => Ok(Duration::from_secs(seconds)),
        None => bail!("{} minutes is too long", value),
    }
}

fn describe_plan(plan: &FocusPlan) -> String {
    let mut description = format!(
        "{}: work {} min, short break {} min",
        plan.name,
        plan.work_duration.as_secs() / 60,
        plan.short_break_duration.as_secs() / 60
    );

    if let (Some(long_break), Some(cycles)) = (plan.long_break_duration, plan.cycles) {
        description.push_str(&format!(
            ", long break {} min every {} work segments",
            long_break.as_secs() / 60,
            cycles
        ));
    }

    description
}
