pub mod error;
pub mod planner;
pub mod problem;
pub mod route_status;
pub mod solution;
pub mod solver;
mod utils;

pub mod json;

pub use error::{DataError, PlanningError, SearchError};
pub use planner::{PlanOutcome, PlanningRequest, plan};

#[cfg(test)]
pub(crate) mod test_utils;
