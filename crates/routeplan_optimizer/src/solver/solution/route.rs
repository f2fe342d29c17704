use crate::{
    problem::{
        node_group::GroupIdx, node_layout::NodeIdx, vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::schedule::{RouteSchedule, evaluate_route, respects_precedences},
};

#[derive(Clone, Debug)]
pub struct WorkingSolutionRoute {
    vehicle_id: VehicleIdx,

    /// Visited nodes, depots excluded
    nodes: Vec<NodeIdx>,

    /// `None` when the current nodes violate a constraint
    schedule: Option<RouteSchedule>,

    distance: f64,

    /// Bumped on every change, used to invalidate cached insertions
    version: usize,
}

impl WorkingSolutionRoute {
    pub fn empty(problem: &VehicleRoutingProblem, vehicle_id: VehicleIdx) -> Self {
        WorkingSolutionRoute {
            vehicle_id,
            nodes: Vec::new(),
            schedule: Some(RouteSchedule::empty(problem)),
            distance: 0.0,
            version: 0,
        }
    }

    pub fn vehicle_id(&self) -> VehicleIdx {
        self.vehicle_id
    }

    pub fn nodes(&self) -> &[NodeIdx] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn schedule(&self) -> Option<&RouteSchedule> {
        self.schedule.as_ref()
    }

    pub fn is_feasible(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn position(&self, node: NodeIdx) -> Option<usize> {
        self.nodes.iter().position(|&candidate| candidate == node)
    }

    pub fn contains_group(&self, problem: &VehicleRoutingProblem, group: GroupIdx) -> bool {
        self.nodes
            .iter()
            .any(|&node| problem.group_of(node) == Some(group))
    }

    /// Evaluates `nodes` for this route's vehicle without changing the route.
    pub fn evaluate(
        &self,
        problem: &VehicleRoutingProblem,
        nodes: &[NodeIdx],
    ) -> Option<RouteSchedule> {
        if !respects_precedences(problem, nodes) {
            return None;
        }

        evaluate_route(problem, self.vehicle_id, nodes)
    }

    /// Replaces the nodes with an already evaluated sequence.
    pub fn replace(&mut self, nodes: Vec<NodeIdx>, schedule: RouteSchedule) {
        self.distance = schedule.distance;
        self.nodes = nodes;
        self.schedule = Some(schedule);
        self.version += 1;
    }

    /// Replaces the nodes and evaluates the new sequence.
    pub fn set_nodes(&mut self, problem: &VehicleRoutingProblem, nodes: Vec<NodeIdx>) {
        self.schedule = self.evaluate(problem, &nodes);
        self.distance = problem.route_distance(&nodes);
        self.nodes = nodes;
        self.version += 1;
    }

    /// Removes every node of `group`, returns `false` when the group was not in the route.
    pub fn remove_group(&mut self, problem: &VehicleRoutingProblem, group: GroupIdx) -> bool {
        if !self.contains_group(problem, group) {
            return false;
        }

        let nodes = self
            .nodes
            .iter()
            .copied()
            .filter(|&node| problem.group_of(node) != Some(group))
            .collect();
        self.set_nodes(problem, nodes);

        true
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_problem, delivery, pickup, test_locations};

    use super::*;

    #[test]
    fn test_remove_group() {
        let problem = create_test_problem(
            test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]),
            vec![
                pickup("p", "L1", "L2", 1.0),
                delivery("d", "L0", "L3", 1.0),
            ],
            1,
            10.0,
        );
        let mut route = WorkingSolutionRoute::empty(&problem, VehicleIdx::new(0));
        route.set_nodes(
            &problem,
            vec![NodeIdx::new(1), NodeIdx::new(3), NodeIdx::new(2)],
        );
        assert!(route.is_feasible());
        assert_eq!(route.version(), 1);

        let group = problem.group_of(NodeIdx::new(1)).unwrap();
        assert!(route.remove_group(&problem, group));

        assert_eq!(route.nodes(), &[NodeIdx::new(3)]);
        assert_eq!(route.distance(), 6000.0);
        assert_eq!(route.version(), 2);
        assert!(!route.remove_group(&problem, group));
    }

    #[test]
    fn test_infeasible_order() {
        let problem = create_test_problem(
            test_locations(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            vec![pickup("p", "L1", "L2", 1.0)],
            1,
            10.0,
        );
        let mut route = WorkingSolutionRoute::empty(&problem, VehicleIdx::new(0));

        route.set_nodes(&problem, vec![NodeIdx::new(2), NodeIdx::new(1)]);

        assert!(!route.is_feasible());
        assert_eq!(route.distance(), 4000.0);
    }
}
