use jiff::{
    SignedDuration,
    civil::{Date, Time, time},
};

use crate::problem::time_window::TimeWindow;

/// Mandatory rest taken once per route.
#[derive(Clone, Debug, PartialEq)]
pub struct BreakRule {
    /// The break must start between these two times
    pub window_start: Time,
    pub window_end: Time,
    pub duration: SignedDuration,
}

impl BreakRule {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_times(self.window_start, self.window_end)
    }

    pub fn duration_seconds(&self) -> i64 {
        self.duration.as_secs()
    }
}

impl Default for BreakRule {
    fn default() -> Self {
        BreakRule {
            window_start: time(13, 45, 0, 0),
            window_end: time(14, 15, 0, 0),
            duration: SignedDuration::from_mins(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlanningParams {
    pub depot_opening: Time,
    pub depot_closing: Time,
    pub max_route_duration: SignedDuration,

    /// `None` plans without any break
    pub break_rule: Option<BreakRule>,

    /// Day the routes are driven, tasks required on another day are rejected
    pub planned_date: Option<Date>,
}

impl Default for PlanningParams {
    fn default() -> Self {
        PlanningParams {
            depot_opening: time(8, 0, 0, 0),
            depot_closing: time(18, 0, 0, 0),
            max_route_duration: SignedDuration::from_hours(10),
            break_rule: Some(BreakRule::default()),
            planned_date: None,
        }
    }
}

impl PlanningParams {
    pub fn depot_window(&self) -> TimeWindow {
        TimeWindow::from_times(self.depot_opening, self.depot_closing)
    }
}
