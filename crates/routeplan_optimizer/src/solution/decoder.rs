use fxhash::FxHashSet;
use jiff::{
    SignedDuration,
    civil::{Date, DateTime},
};
use tracing::{debug, instrument};

use crate::{
    problem::{
        node_layout::{DEPOT, NodeIdx, TaskIdx, TaskRole},
        vehicle::Vehicle,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solution::types::{
        Fulfilment, PlannedRoute, RouteBreak, Solution, Stop, StopLoad, StopRole, TimeRange,
    },
    solver::{
        schedule::{Interval, RouteSchedule},
        solution::{route::WorkingSolutionRoute, working_solution::WorkingSolution},
    },
};

fn datetime_at(date: Option<Date>, seconds: i64) -> Option<DateTime> {
    date?
        .at(0, 0, 0, 0)
        .checked_add(SignedDuration::from_secs(seconds))
        .ok()
}

fn time_range(interval: Interval, date: Option<Date>) -> TimeRange {
    TimeRange {
        earliest: interval.earliest,
        latest: interval.latest,
        earliest_at: datetime_at(date, interval.earliest),
        latest_at: datetime_at(date, interval.latest),
    }
}

/// Tasks fulfilled at each stop of a route: depot stops only list the tasks of this route.
fn stop_fulfilments(
    problem: &VehicleRoutingProblem,
    route_tasks: &FxHashSet<TaskIdx>,
    node: NodeIdx,
    role: StopRole,
) -> Vec<Fulfilment> {
    let layout = problem.layout();
    let mut node_tasks = problem
        .node(node)
        .tasks
        .iter()
        .filter(|node_task| match role {
            StopRole::StartDepot => {
                node_task.role == TaskRole::Pickup && route_tasks.contains(&node_task.task)
            }
            StopRole::EndDepot => {
                node_task.role == TaskRole::Delivery && route_tasks.contains(&node_task.task)
            }
            StopRole::Pickup | StopRole::Delivery => true,
        })
        .collect::<Vec<_>>();
    node_tasks.sort_by_key(|node_task| (node_task.task, node_task.role));

    node_tasks
        .into_iter()
        .map(|node_task| Fulfilment {
            task_id: layout.task(node_task.task).id.clone(),
            role: node_task.role,
        })
        .collect()
}

fn decode_route(
    problem: &VehicleRoutingProblem,
    route: &WorkingSolutionRoute,
    schedule: &RouteSchedule,
    vehicle: &Vehicle,
    date: Option<Date>,
) -> PlannedRoute {
    let route_tasks = route
        .nodes()
        .iter()
        .filter_map(|&node| problem.group_of(node))
        .flat_map(|group| problem.group_tasks(group).iter().copied())
        .collect::<FxHashSet<_>>();

    let path = std::iter::once(DEPOT)
        .chain(route.nodes().iter().copied())
        .chain(std::iter::once(DEPOT))
        .collect::<Vec<_>>();
    let last = path.len() - 1;

    let mut stops = Vec::with_capacity(path.len());
    let mut cumulative_distance = 0.0;

    for (index, &node) in path.iter().enumerate() {
        let role = if index == 0 {
            StopRole::StartDepot
        } else if index == last {
            StopRole::EndDepot
        } else if problem.node(node).has_pickup() {
            StopRole::Pickup
        } else {
            StopRole::Delivery
        };

        let (distance_from_previous, travel_time_from_previous) = if index == 0 {
            (0.0, 0)
        } else {
            (
                problem.distance(path[index - 1], node),
                problem.travel_time(path[index - 1], node),
            )
        };
        cumulative_distance += distance_from_previous;

        let service = if index == last {
            0
        } else {
            problem.node(node).service_seconds
        };
        let arrival = schedule.arrivals[index];
        let load_change = if index == 0 {
            schedule.loads[0]
        } else {
            schedule.loads[index] - schedule.loads[index - 1]
        };

        let fulfilments = stop_fulfilments(problem, &route_tasks, node, role);
        let mut task_ids = fulfilments
            .iter()
            .map(|fulfilment| fulfilment.task_id.clone())
            .collect::<Vec<_>>();
        task_ids.dedup();

        let node_data = problem.node(node);
        stops.push(Stop {
            location_id: node_data.location_id.clone(),
            name: node_data.name.clone(),
            role,
            task_ids,
            fulfilments,
            arrival_window: time_range(arrival, date),
            departure_window: time_range(arrival.shifted(service), date),
            load_change: load_change.into(),
            load_after: StopLoad::from(schedule.loads[index]),
            distance_from_previous,
            travel_time_from_previous,
            cumulative_distance,
            cumulative_time: arrival.earliest - schedule.arrivals[0].earliest,
        });
    }

    PlannedRoute {
        vehicle_id: vehicle.id.clone(),
        vehicle_label: vehicle.label.clone(),
        stops,
        total_distance_m: schedule.distance,
        total_duration_s: schedule.duration,
        scheduled_break: problem.break_spec().zip(schedule.scheduled_break.as_ref()).map(
            |(spec, scheduled_break)| RouteBreak {
                placement: scheduled_break.placement,
                start_window: time_range(scheduled_break.start, date),
                duration_seconds: spec.duration,
            },
        ),
    }
}

/// Converts the routes of a solved instance into planned routes, skipping vehicles without
/// any stop.
#[instrument(skip_all, level = "debug")]
pub fn decode(solution: &WorkingSolution, vehicles: &[Vehicle], date: Option<Date>) -> Solution {
    let problem = solution.problem();

    let routes = solution
        .routes()
        .iter()
        .filter(|route| !route.is_empty())
        .filter_map(|route| {
            let schedule = route.schedule()?;
            let vehicle = vehicles.get(route.vehicle_id().get())?;
            Some(decode_route(problem, route, schedule, vehicle, date))
        })
        .collect::<Vec<_>>();

    let total_distance_m: f64 = routes.iter().map(|route| route.total_distance_m).sum();
    debug!(routes = routes.len(), total_distance_m, "Decoded solution");

    Solution {
        routes,
        total_distance_m,
        planned_date: date,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::civil::date;

    use crate::{
        solver::{insertion::best_route_insertion, solution::route_id::RouteIdx},
        test_utils::{create_test_problem, delivery, pickup, test_locations, test_vehicles},
    };

    use super::*;

    fn solved(tasks: Vec<crate::problem::task::Task>, num_vehicles: usize) -> WorkingSolution {
        let problem = Arc::new(create_test_problem(
            test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            tasks,
            num_vehicles,
            20.0,
        ));
        let mut solution = WorkingSolution::new(problem);
        for group in solution.unassigned_groups().collect::<Vec<_>>() {
            let insertion = best_route_insertion(&solution, RouteIdx::new(0), group).unwrap();
            solution.insert(insertion);
        }
        solution
    }

    #[test]
    fn test_decode_roles_and_loads() {
        let solution = solved(
            vec![delivery("a", "L0", "L1", 5.0), delivery("b", "L0", "L2", 5.0)],
            2,
        );

        let decoded = decode(&solution, &test_vehicles(2, 20.0), None);

        // the second vehicle has no stop
        assert_eq!(decoded.routes.len(), 1);
        let route = &decoded.routes[0];
        let roles = route.stops.iter().map(|stop| stop.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![
                StopRole::StartDepot,
                StopRole::Delivery,
                StopRole::Delivery,
                StopRole::EndDepot
            ]
        );
        assert_eq!(route.stops[0].task_ids, vec!["a", "b"]);
        assert!(route.stops[3].task_ids.is_empty());
        assert_eq!(route.total_distance_m, 4000.0);
        assert_eq!(decoded.total_distance_m, 4000.0);
        assert_eq!(route.stops[3].cumulative_distance, 4000.0);
        assert_eq!(route.stops[2].load_after.weight_kg, 10.0);
        assert_eq!(route.stops[2].load_change.weight_kg, 5.0);
        assert_eq!(route.visits().count(), 2);
    }

    #[test]
    fn test_decode_shared_destination() {
        let solution = solved(
            vec![pickup("p", "L1", "L2", 1.0), delivery("d", "L0", "L2", 1.0)],
            1,
        );

        let decoded = decode(&solution, &test_vehicles(1, 20.0), None);

        let stop = decoded.routes[0]
            .visits()
            .find(|stop| stop.location_id == "L2")
            .unwrap();
        assert_eq!(stop.task_ids, vec!["p", "d"]);
        assert_eq!(stop.role, StopRole::Delivery);
        let pickup_stop = decoded.routes[0]
            .visits()
            .find(|stop| stop.location_id == "L1")
            .unwrap();
        assert_eq!(pickup_stop.role, StopRole::Pickup);
    }

    #[test]
    fn test_decode_windows_and_dates() {
        let solution = solved(vec![delivery("a", "L0", "L1", 1.0)], 1);

        let decoded = decode(&solution, &test_vehicles(1, 20.0), Some(date(2026, 3, 2)));

        let route = &decoded.routes[0];
        let stop = &route.stops[1];
        assert!(stop.arrival_window.earliest <= stop.arrival_window.latest);
        assert_eq!(stop.departure_window.earliest, stop.arrival_window.earliest);
        let midnight = date(2026, 3, 2).at(0, 0, 0, 0);
        assert_eq!(
            stop.arrival_window.earliest_at,
            Some(midnight + SignedDuration::from_secs(stop.arrival_window.earliest))
        );
        assert!(route.scheduled_break.is_some());
        assert_eq!(route.scheduled_break.as_ref().unwrap().duration_seconds, 30 * 60);
        assert_eq!(route.stops[1].travel_time_from_previous, 100);
    }
}
