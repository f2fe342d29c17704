use std::sync::Arc;

use routeplan_matrix_providers::MatrixProvider;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::{PlanningError, SearchError},
    problem::{
        location::Location, node_layout::NodeLayout, planning_params::PlanningParams,
        task::Task, vehicle::Vehicle, vehicle_routing_problem::VehicleRoutingProblem,
    },
    solution::{decoder::decode, types::Solution},
    solver::{search::solve, search_params::SearchParams},
};

/// Snapshot of the records to plan, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct PlanningRequest {
    pub depot_id: String,
    pub locations: Vec<Location>,
    pub tasks: Vec<Task>,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Solved(Solution),

    /// The vehicles cannot serve every task (or there are none), nothing is planned
    Infeasible { unassigned_task_ids: Vec<String> },
}

impl PlanOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            PlanOutcome::Solved(solution) => Some(solution),
            PlanOutcome::Infeasible { .. } => None,
        }
    }
}

/// Plans routes for every task of the request: builds the instance, fetches the matrices,
/// searches and decodes the routes.
#[instrument(
    skip_all,
    fields(tasks = request.tasks.len(), vehicles = request.vehicles.len())
)]
pub async fn plan<M: MatrixProvider>(
    request: &PlanningRequest,
    provider: &M,
    planning_params: &PlanningParams,
    search_params: &SearchParams,
) -> Result<PlanOutcome, PlanningError> {
    if request.tasks.is_empty() {
        info!("Nothing to plan");
        return Ok(PlanOutcome::Solved(Solution::empty(
            planning_params.planned_date,
        )));
    }

    if request.vehicles.is_empty() {
        warn!("No vehicle to plan with");
        return Ok(PlanOutcome::Infeasible {
            unassigned_task_ids: request.tasks.iter().map(|task| task.id.clone()).collect(),
        });
    }

    let layout = NodeLayout::build(
        &request.depot_id,
        &request.tasks,
        &request.vehicles,
        &request.locations,
        planning_params,
    )?;
    let matrices = provider.matrix(&layout.points()).await?;
    let problem = Arc::new(VehicleRoutingProblem::new(
        layout,
        &matrices,
        planning_params,
    )?);

    info!(
        nodes = problem.num_nodes(),
        groups = problem.groups().len(),
        "Searching routes"
    );

    match solve(problem, search_params) {
        Ok(solution) => Ok(PlanOutcome::Solved(decode(
            &solution,
            &request.vehicles,
            planning_params.planned_date,
        ))),
        Err(SearchError::Infeasible {
            unassigned_task_ids,
        }) => {
            warn!(?unassigned_task_ids, "No feasible plan");
            Ok(PlanOutcome::Infeasible {
                unassigned_task_ids,
            })
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, civil::time};
    use routeplan_matrix_providers::{NoCache, TravelMatrixClient, TravelMatrixProvider};

    use crate::{
        error::DataError,
        solution::types::{PlannedRoute, StopRole},
        solver::{schedule::BreakPlacement, search_params::Termination},
        test_utils::{EuclideanProvider, delivery, pickup, test_locations, test_vehicles},
    };

    use super::*;

    fn search_params() -> SearchParams {
        SearchParams {
            terminations: vec![Termination::Iterations(200)],
            ..SearchParams::default()
        }
    }

    async fn solve(request: &PlanningRequest) -> Result<PlanOutcome, PlanningError> {
        solve_with(request, &PlanningParams::default()).await
    }

    async fn solve_with(
        request: &PlanningRequest,
        params: &PlanningParams,
    ) -> Result<PlanOutcome, PlanningError> {
        plan(request, &EuclideanProvider, params, &search_params()).await
    }

    async fn solved(request: &PlanningRequest) -> Solution {
        match solve(request).await {
            Ok(PlanOutcome::Solved(solution)) => solution,
            other => panic!("expected a solution, got {other:?}"),
        }
    }

    /// Depot `D` at the origin, customers on a 3x3 grid around it.
    fn grid_request() -> PlanningRequest {
        let mut locations = vec![Location::new("D", 0.0, 0.0)];
        for i in 0..3 {
            for j in 0..3 {
                locations.push(Location::new(
                    format!("C{}", i * 3 + j),
                    f64::from(i) - 1.0,
                    f64::from(j) + 1.0,
                ));
            }
        }

        let tasks = vec![
            delivery("d0", "D", "C0", 10.0),
            delivery("d1", "D", "C1", 15.0),
            delivery("d2", "D", "C2", 20.0),
            pickup("p3", "C3", "D", 10.0),
            pickup("p4", "C4", "C7", 25.0),
            pickup("p5", "C5", "C8", 5.0),
            delivery("d6", "D", "C6", 30.0),
            pickup("p7", "C0", "C2", 5.0),
        ];

        PlanningRequest {
            depot_id: String::from("D"),
            locations,
            tasks,
            vehicles: vec![Vehicle::new("V0", 80.0, 10.0), Vehicle::new("V1", 80.0, 10.0)],
        }
    }

    fn stop_index(route: &PlannedRoute, location_id: &str, task_id: &str) -> Option<usize> {
        route.stops.iter().position(|stop| {
            stop.location_id == location_id && stop.task_ids.iter().any(|id| id == task_id)
        })
    }

    #[tokio::test]
    async fn test_two_deliveries_single_route() {
        let request = PlanningRequest {
            depot_id: String::from("L0"),
            locations: test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            tasks: vec![delivery("a", "L0", "L1", 5.0), delivery("b", "L0", "L2", 5.0)],
            vehicles: vec![Vehicle::new("V0", 20.0, 10.0)],
        };

        let solution = solved(&request).await;

        assert_eq!(solution.routes.len(), 1);
        let route = &solution.routes[0];
        assert!((route.total_distance_m - 4000.0).abs() < 1e-6);
        assert_eq!(route.stops.first().map(|stop| stop.role), Some(StopRole::StartDepot));
        assert_eq!(route.stops.last().map(|stop| stop.role), Some(StopRole::EndDepot));
        assert_eq!(route.visits().count(), 2);
    }

    #[tokio::test]
    async fn test_over_capacity_is_infeasible() {
        let request = PlanningRequest {
            depot_id: String::from("L0"),
            locations: test_locations(&[(0.0, 0.0), (0.0, 1.0)]),
            tasks: vec![delivery("a", "L0", "L1", 5.0)],
            vehicles: vec![Vehicle::new("V0", 3.0, 10.0)],
        };

        let outcome = solve(&request).await.unwrap();

        assert_eq!(
            outcome,
            PlanOutcome::Infeasible {
                unassigned_task_ids: vec![String::from("a")]
            }
        );
        assert!(outcome.solution().is_none());
    }

    #[tokio::test]
    async fn test_shared_destination_lists_both_tasks() {
        let request = PlanningRequest {
            depot_id: String::from("L0"),
            locations: test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            tasks: vec![pickup("p", "L1", "L2", 1.0), delivery("d", "L0", "L2", 1.0)],
            vehicles: vec![Vehicle::new("V0", 20.0, 10.0)],
        };

        let solution = solved(&request).await;

        let stops = solution
            .routes
            .iter()
            .flat_map(|route| route.visits())
            .filter(|stop| stop.location_id == "L2")
            .collect::<Vec<_>>();
        assert_eq!(stops.len(), 1);
        assert!(stops[0].task_ids.contains(&String::from("p")));
        assert!(stops[0].task_ids.contains(&String::from("d")));
    }

    #[tokio::test]
    async fn test_empty_tasks_plan_nothing() {
        let request = PlanningRequest {
            depot_id: String::from("L0"),
            ..PlanningRequest::default()
        };

        let solution = solved(&request).await;

        assert!(solution.routes.is_empty());
        assert_eq!(solution.total_distance_m, 0.0);
    }

    #[tokio::test]
    async fn test_no_vehicles_is_infeasible() {
        let mut request = grid_request();
        request.vehicles.clear();

        let outcome = solve(&request).await.unwrap();

        assert_eq!(
            outcome,
            PlanOutcome::Infeasible {
                unassigned_task_ids: request.tasks.iter().map(|task| task.id.clone()).collect(),
            }
        );
    }

    #[tokio::test]
    async fn test_data_errors() {
        let mut request = grid_request();
        request.tasks.push(delivery("x", "D", "nowhere", 1.0));
        assert!(matches!(
            solve(&request).await,
            Err(PlanningError::Data(DataError::UnknownLocation { .. }))
        ));

        let mut request = grid_request();
        request.tasks.push(delivery("d0", "D", "C1", 1.0));
        assert!(matches!(
            solve(&request).await,
            Err(PlanningError::Data(DataError::DuplicateTask(_)))
        ));
    }

    #[tokio::test]
    async fn test_every_task_served_once_with_precedence() {
        let request = grid_request();

        let solution = solved(&request).await;

        for task in &request.tasks {
            let serving = solution
                .routes
                .iter()
                .filter(|route| {
                    route
                        .stops
                        .iter()
                        .any(|stop| stop.task_ids.contains(&task.id))
                })
                .collect::<Vec<_>>();
            assert_eq!(serving.len(), 1, "task {} must be on exactly one route", task.id);

            let route = serving[0];
            let origin = stop_index(route, &task.origin_id, &task.id).unwrap_or(0);
            let destination = route
                .stops
                .iter()
                .rposition(|stop| {
                    stop.location_id == task.destination_id && stop.task_ids.contains(&task.id)
                })
                .unwrap_or(route.stops.len() - 1);
            assert!(origin < destination, "task {} is served backwards", task.id);
            assert!(
                route.stops[origin].cumulative_time <= route.stops[destination].cumulative_time
            );
        }
    }

    #[tokio::test]
    async fn test_loads_within_capacity() {
        let request = grid_request();

        let solution = solved(&request).await;

        for route in &solution.routes {
            let vehicle = request
                .vehicles
                .iter()
                .find(|vehicle| vehicle.id == route.vehicle_id)
                .unwrap();
            for stop in &route.stops {
                assert!(stop.load_after.weight_kg >= -1e-9);
                assert!(stop.load_after.weight_kg <= vehicle.capacity_weight + 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn test_arrivals_respect_delivery_windows() {
        let mut request = grid_request();
        request.tasks[0] =
            delivery("d0", "D", "C0", 10.0).with_window(time(10, 0, 0, 0), time(11, 0, 0, 0));
        request.locations[5].opening_time = Some(time(12, 0, 0, 0));
        request.locations[5].closing_time = Some(time(16, 0, 0, 0));
        request.locations[1] = request.locations[1].clone().with_service_minutes(15.0);

        let solution = solved(&request).await;

        let windows = [
            ("C0", 10 * 3600, 11 * 3600),
            (request.locations[5].id.as_str(), 12 * 3600, 16 * 3600),
        ];
        for (location_id, start, end) in windows {
            let stop = solution
                .routes
                .iter()
                .flat_map(|route| route.visits())
                .find(|stop| stop.location_id == location_id)
                .unwrap();
            assert!(stop.arrival_window.earliest <= end);
            assert!(stop.arrival_window.latest >= start);
            assert!(stop.arrival_window.earliest >= start);
        }

        let c0 = solution
            .routes
            .iter()
            .flat_map(|route| route.visits())
            .find(|stop| stop.location_id == "C0")
            .unwrap();
        assert_eq!(
            c0.departure_window.earliest,
            c0.arrival_window.earliest + 15 * 60
        );
    }

    #[tokio::test]
    async fn test_same_instance_same_plan() {
        let request = grid_request();

        let first = solved(&request).await;
        let second = solved(&request).await;

        let distances = |solution: &Solution| {
            solution
                .routes
                .iter()
                .map(|route| (route.vehicle_id.clone(), route.total_distance_m))
                .collect::<Vec<_>>()
        };
        assert_eq!(distances(&first), distances(&second));
    }

    #[tokio::test]
    async fn test_plan_with_as_the_crow_flies_client() {
        let client = TravelMatrixClient::new(
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh: 50.0 },
            NoCache,
        )
        .unwrap();
        let request = PlanningRequest {
            depot_id: String::from("depot"),
            locations: vec![
                Location::new("depot", 50.8503, 4.3517),
                Location::new("antwerp", 51.2194, 4.4025),
                Location::new("ghent", 51.0543, 3.7174),
            ],
            tasks: vec![
                delivery("t1", "depot", "antwerp", 100.0),
                pickup("t2", "ghent", "depot", 50.0),
            ],
            vehicles: vec![Vehicle::new("truck", 500.0, 10.0)],
        };

        let outcome = plan(
            &request,
            &client,
            &PlanningParams::default(),
            &search_params(),
        )
        .await
        .unwrap();

        let solution = outcome.solution().unwrap();
        assert_eq!(solution.routes.len(), 1);
        assert!(solution.total_distance_m > 0.0);
        assert_eq!(solution.routes[0].visits().count(), 2);
    }

    /// Depot `L0` and three stops on a line, each taking `service_minutes` to serve.
    fn long_service_request(service_minutes: f64, num_vehicles: usize) -> PlanningRequest {
        let mut locations = test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]);
        for location in &mut locations[1..] {
            location.avg_service_minutes = service_minutes;
        }

        PlanningRequest {
            depot_id: String::from("L0"),
            locations,
            tasks: vec![
                delivery("a", "L0", "L1", 1.0),
                delivery("b", "L0", "L2", 1.0),
                delivery("c", "L0", "L3", 1.0),
            ],
            vehicles: test_vehicles(num_vehicles, 10.0),
        }
    }

    #[tokio::test]
    async fn test_break_taken_between_stops_within_window() {
        // 7h30 of service from 08:00 cannot end before the break window
        let request = long_service_request(150.0, 1);

        let solution = solved(&request).await;

        assert_eq!(solution.routes.len(), 1);
        let route = &solution.routes[0];
        let scheduled_break = route.scheduled_break.as_ref().unwrap();
        assert!(matches!(
            scheduled_break.placement,
            BreakPlacement::AfterStop(1..=3)
        ));
        assert_eq!(scheduled_break.duration_seconds, 30 * 60);

        let window_start = 13 * 3600 + 45 * 60;
        let window_end = 14 * 3600 + 15 * 60;
        assert!(scheduled_break.start_window.earliest >= window_start);
        assert!(scheduled_break.start_window.latest <= window_end);
        assert!(scheduled_break.start_window.earliest <= scheduled_break.start_window.latest);

        assert!(route.total_duration_s >= 3 * 150 * 60 + 30 * 60);
        assert!(route.total_duration_s <= 10 * 3600);
    }

    #[tokio::test]
    async fn test_routes_within_max_duration() {
        let params = PlanningParams {
            max_route_duration: SignedDuration::from_hours(4),
            break_rule: None,
            ..PlanningParams::default()
        };

        let outcome = solve_with(&long_service_request(90.0, 1), &params)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PlanOutcome::Infeasible { ref unassigned_task_ids } if !unassigned_task_ids.is_empty()
        ));

        let outcome = solve_with(&long_service_request(90.0, 2), &params)
            .await
            .unwrap();
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.routes.len(), 2);
        assert_eq!(
            solution
                .routes
                .iter()
                .map(|route| route.visits().count())
                .sum::<usize>(),
            3
        );
        for route in &solution.routes {
            assert!(route.total_duration_s <= 4 * 3600);
            assert!(route.scheduled_break.is_none());
        }
    }
}
