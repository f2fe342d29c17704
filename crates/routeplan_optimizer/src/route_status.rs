use fxhash::FxHashSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::solution::types::PlannedRoute;

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Pending,
    Assigned,
    InTransit,
    Completed,
    Delayed,
    Cancelled,
}

/// Record updates the caller applies after saving a planned route with a new status.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteSideEffect {
    IncrementOdometer { vehicle_id: String, km: f64 },
    MarkTasksAssigned { task_ids: Vec<String> },
    ReleaseTasks { task_ids: Vec<String> },
}

fn route_task_ids(route: &PlannedRoute) -> Vec<String> {
    let mut seen = FxHashSet::default();

    route
        .visits()
        .flat_map(|stop| stop.task_ids.iter())
        .filter(|task_id| seen.insert(task_id.as_str()))
        .cloned()
        .collect()
}

/// Side effects of moving `route` from `old` to `new`. `None` is a route saved for the first
/// time. Saving a route again with the same status has no effect.
pub fn on_route_status_change(
    old: Option<RouteStatus>,
    new: RouteStatus,
    route: &PlannedRoute,
) -> Vec<RouteSideEffect> {
    if old == Some(new) {
        return Vec::new();
    }

    match new {
        RouteStatus::Completed if route.total_distance_m > 0.0 => {
            vec![RouteSideEffect::IncrementOdometer {
                vehicle_id: route.vehicle_id.clone(),
                km: route.total_distance_m / 1000.0,
            }]
        }
        RouteStatus::Assigned => vec![RouteSideEffect::MarkTasksAssigned {
            task_ids: route_task_ids(route),
        }],
        RouteStatus::Cancelled => vec![RouteSideEffect::ReleaseTasks {
            task_ids: route_task_ids(route),
        }],
        _ => Vec::new(),
    }
}
