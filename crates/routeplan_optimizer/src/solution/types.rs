use jiff::civil::{Date, DateTime};
use serde::Serialize;

use crate::{
    problem::{load::Load, node_layout::TaskRole},
    solver::schedule::BreakPlacement,
};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StopRole {
    StartDepot,
    Pickup,
    Delivery,
    EndDepot,
}

/// Feasible times in seconds from midnight, with civil datetimes when the planned date is
/// known.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimeRange {
    pub earliest: i64,
    pub latest: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_at: Option<DateTime>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct StopLoad {
    pub weight_kg: f64,
    pub volume_m3: f64,
}

impl From<Load> for StopLoad {
    fn from(load: Load) -> Self {
        StopLoad {
            weight_kg: load.kg(),
            volume_m3: load.m3(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Fulfilment {
    pub task_id: String,
    pub role: TaskRole,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Stop {
    pub location_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub role: StopRole,

    /// Every task served at the stop, in task order
    pub task_ids: Vec<String>,
    pub fulfilments: Vec<Fulfilment>,

    pub arrival_window: TimeRange,

    /// Arrival window shifted by the service time
    pub departure_window: TimeRange,

    pub load_change: StopLoad,

    /// Load on board when leaving the stop
    pub load_after: StopLoad,

    /// Meters
    pub distance_from_previous: f64,

    /// Seconds
    pub travel_time_from_previous: i64,

    pub cumulative_distance: f64,

    /// Seconds between the earliest departure from the depot and the earliest arrival here
    pub cumulative_time: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteBreak {
    pub placement: BreakPlacement,
    pub start_window: TimeRange,
    pub duration_seconds: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub vehicle_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_label: Option<String>,

    pub stops: Vec<Stop>,
    pub total_distance_m: f64,
    pub total_duration_s: i64,

    #[serde(rename = "break", skip_serializing_if = "Option::is_none")]
    pub scheduled_break: Option<RouteBreak>,
}

impl PlannedRoute {
    /// Stops between the two depot stops.
    pub fn visits(&self) -> impl Iterator<Item = &Stop> {
        let last = self.stops.len().saturating_sub(1);
        self.stops
            .iter()
            .enumerate()
            .filter(move |(index, _)| *index != 0 && *index != last)
            .map(|(_, stop)| stop)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct Solution {
    pub routes: Vec<PlannedRoute>,
    pub total_distance_m: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_date: Option<Date>,
}

impl Solution {
    pub fn empty(planned_date: Option<Date>) -> Self {
        Solution {
            routes: Vec::new(),
            total_distance_m: 0.0,
            planned_date,
        }
    }

    pub fn route(&self, vehicle_id: &str) -> Option<&PlannedRoute> {
        self.routes
            .iter()
            .find(|route| route.vehicle_id == vehicle_id)
    }
}
