use routeplan_matrix_providers::{MatrixProviderError, TravelMatrices};

use crate::problem::{
    load::Load,
    node_group::{GroupIdx, NodeGroup, build_node_groups, precedence_edges},
    node_layout::{DEPOT, Node, NodeIdx, NodeLayout, TaskIdx},
    planning_params::PlanningParams,
    time_window::TimeWindow,
    vehicle::VehicleIdx,
};

/// Break as seen by the solver: start window and duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakSpec {
    pub window: TimeWindow,
    pub duration: i64,
}

/// Immutable routing instance for one planning call.
pub struct VehicleRoutingProblem {
    layout: NodeLayout,
    groups: Vec<NodeGroup>,
    node_groups: Vec<Option<GroupIdx>>,
    precedences: Vec<(NodeIdx, NodeIdx)>,

    /// Meters, row-major
    distances: Vec<f64>,

    /// Whole seconds, row-major
    times: Vec<i64>,

    break_spec: Option<BreakSpec>,
    max_route_duration: i64,
}

impl VehicleRoutingProblem {
    pub fn new(
        layout: NodeLayout,
        matrices: &TravelMatrices,
        params: &PlanningParams,
    ) -> Result<Self, MatrixProviderError> {
        if !matrices.is_well_formed() || matrices.num_locations() != layout.num_nodes() {
            return Err(MatrixProviderError::InvalidMatrix {
                expected: layout.num_nodes(),
                actual: matrices.num_locations(),
            });
        }

        let (groups, node_groups) = build_node_groups(&layout);
        let precedences = precedence_edges(&layout);

        Ok(VehicleRoutingProblem {
            groups,
            node_groups,
            precedences,
            distances: matrices.distances.clone(),
            times: matrices
                .times
                .iter()
                .map(|time| time.round() as i64)
                .collect(),
            break_spec: params.break_rule.as_ref().map(|rule| BreakSpec {
                window: rule.window(),
                duration: rule.duration_seconds(),
            }),
            max_route_duration: params.max_route_duration.as_secs(),
            layout,
        })
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn node(&self, node: NodeIdx) -> &Node {
        self.layout.node(node)
    }

    pub fn num_nodes(&self) -> usize {
        self.layout.num_nodes()
    }

    pub fn num_vehicles(&self) -> usize {
        self.layout.capacities().len()
    }

    pub fn capacity(&self, vehicle: VehicleIdx) -> Load {
        self.layout.capacities()[vehicle.get()]
    }

    pub fn groups(&self) -> &[NodeGroup] {
        &self.groups
    }

    pub fn group(&self, group: GroupIdx) -> &NodeGroup {
        &self.groups[group]
    }

    pub fn group_of(&self, node: NodeIdx) -> Option<GroupIdx> {
        self.node_groups[node.get()]
    }

    /// Every task that is served by the nodes of the group.
    pub fn group_tasks(&self, group: GroupIdx) -> &[TaskIdx] {
        self.groups[group].tasks()
    }

    pub fn precedences(&self) -> &[(NodeIdx, NodeIdx)] {
        &self.precedences
    }

    pub fn distance(&self, from: NodeIdx, to: NodeIdx) -> f64 {
        self.distances[from.get() * self.num_nodes() + to.get()]
    }

    pub fn travel_time(&self, from: NodeIdx, to: NodeIdx) -> i64 {
        self.times[from.get() * self.num_nodes() + to.get()]
    }

    pub fn depot_window(&self) -> TimeWindow {
        self.layout.node(DEPOT).window
    }

    pub fn break_spec(&self) -> Option<BreakSpec> {
        self.break_spec
    }

    pub fn max_route_duration(&self) -> i64 {
        self.max_route_duration
    }

    /// Distance of depot -> nodes -> depot.
    pub fn route_distance(&self, nodes: &[NodeIdx]) -> f64 {
        if nodes.is_empty() {
            return 0.0;
        }

        let mut previous = DEPOT;
        let mut distance = 0.0;
        for &node in nodes.iter().chain(std::iter::once(&DEPOT)) {
            distance += self.distance(previous, node);
            previous = node;
        }
        distance
    }
}
