mod focus_plan_repository;

pub use focus_plan_repository::SqliteFocusPlanRepository;
