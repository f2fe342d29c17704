use routeplan_matrix_providers::MatrixProviderError;
use thiserror::Error;

/// The planning request cannot be turned into a routing instance.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("At least 2 distinct locations are required, got {0}")]
    NotEnoughLocations(usize),

    #[error("Unknown location '{location_id}' referenced by {referenced_by}")]
    UnknownLocation {
        location_id: String,
        referenced_by: String,
    },

    #[error("Duplicate id '{0}'")]
    DuplicateTask(String),

    #[error("Invalid {field} for '{id}': {value}")]
    InvalidQuantity {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("Task '{0}' has a delivery window that does not overlap its destination opening hours")]
    EmptyTimeWindow(String),

    #[error("Task '{task_id}' is required on {required_date}, planning is for {planned_date}")]
    DateMismatch {
        task_id: String,
        required_date: jiff::civil::Date,
        planned_date: jiff::civil::Date,
    },

    #[error("Task '{0}' starts and ends at the depot")]
    DepotOnlyTask(String),

    #[error("No vehicle available")]
    NoVehicles,

    #[error("Invalid break rule: window {window_start} to {window_end}, duration {duration}")]
    InvalidBreakRule {
        window_start: jiff::civil::Time,
        window_end: jiff::civil::Time,
        duration: jiff::SignedDuration,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("No feasible assignment for tasks {unassigned_task_ids:?}")]
    Infeasible { unassigned_task_ids: Vec<String> },

    #[error("Search budget exhausted before an initial solution was built")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Provider(#[from] MatrixProviderError),

    #[error(transparent)]
    Search(#[from] SearchError),
}
