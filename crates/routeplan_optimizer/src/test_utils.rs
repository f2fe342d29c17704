use routeplan_matrix_providers::{MatrixProvider, MatrixProviderError, TravelMatrices};

use crate::problem::{
    location::Location,
    node_layout::NodeLayout,
    planning_params::PlanningParams,
    task::{Task, TaskKind},
    vehicle::Vehicle,
    vehicle_routing_problem::VehicleRoutingProblem,
};

/// Locations `L0`, `L1`, ... at the given `(lat, lon)` coordinates.
pub fn test_locations(coordinates: &[(f64, f64)]) -> Vec<Location> {
    coordinates
        .iter()
        .enumerate()
        .map(|(index, &(lat, lon))| Location::new(format!("L{index}"), lat, lon))
        .collect()
}

pub fn delivery(id: &str, origin: &str, destination: &str, kg: f64) -> Task {
    Task::new(id, TaskKind::Delivery, origin, destination).with_load(kg, 0.0)
}

pub fn pickup(id: &str, origin: &str, destination: &str, kg: f64) -> Task {
    Task::new(id, TaskKind::Pickup, origin, destination).with_load(kg, 0.0)
}

pub fn test_vehicles(count: usize, capacity_kg: f64) -> Vec<Vehicle> {
    (0..count)
        .map(|index| Vehicle::new(format!("V{index}"), capacity_kg, 100.0))
        .collect()
}

/// Straight line distances in coordinate units times 1000 meters, driven at 10 m/s.
pub fn euclidean_matrices(points: &[geo_types::Point]) -> TravelMatrices {
    let distances = points
        .iter()
        .map(|from| {
            points
                .iter()
                .map(|to| (from.x() - to.x()).hypot(from.y() - to.y()) * 1000.0)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let times = distances
        .iter()
        .map(|row| row.iter().map(|distance| distance / 10.0).collect())
        .collect();

    TravelMatrices::from_rows(distances, times)
}

/// Serves [`euclidean_matrices`] to the planner.
pub struct EuclideanProvider;

impl MatrixProvider for EuclideanProvider {
    async fn matrix(
        &self,
        points: &[geo_types::Point],
    ) -> Result<TravelMatrices, MatrixProviderError> {
        Ok(euclidean_matrices(points))
    }
}

pub fn create_test_problem(
    locations: Vec<Location>,
    tasks: Vec<Task>,
    num_vehicles: usize,
    capacity_kg: f64,
) -> VehicleRoutingProblem {
    create_test_problem_with_params(
        locations,
        tasks,
        num_vehicles,
        capacity_kg,
        PlanningParams::default(),
    )
}

/// Problem with `L0` as depot and Euclidean matrices.
pub fn create_test_problem_with_params(
    locations: Vec<Location>,
    tasks: Vec<Task>,
    num_vehicles: usize,
    capacity_kg: f64,
    params: PlanningParams,
) -> VehicleRoutingProblem {
    let layout = NodeLayout::build(
        "L0",
        &tasks,
        &test_vehicles(num_vehicles, capacity_kg),
        &locations,
        &params,
    )
    .unwrap();
    let matrices = euclidean_matrices(&layout.points());

    VehicleRoutingProblem::new(layout, &matrices, &params).unwrap()
}
