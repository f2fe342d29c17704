use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::{
    problem::{
        node_group::GroupIdx,
        node_layout::{NodeIdx, TaskIdx},
        vehicle::VehicleIdx,
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{
        insertion::Insertion,
        schedule::{RouteSchedule, merge_at_gaps},
        solution::{route::WorkingSolutionRoute, route_id::RouteIdx},
    },
};

#[derive(Clone)]
pub struct WorkingSolution {
    problem: Arc<VehicleRoutingProblem>,

    /// One route per vehicle, in vehicle order
    routes: Vec<WorkingSolutionRoute>,

    /// Bit set for every group served by a route
    assigned_groups: FixedBitSet,
}

impl WorkingSolution {
    pub fn new(problem: Arc<VehicleRoutingProblem>) -> Self {
        let routes = VehicleIdx::range(problem.num_vehicles())
            .map(|vehicle_id| WorkingSolutionRoute::empty(&problem, vehicle_id))
            .collect();
        let assigned_groups = FixedBitSet::with_capacity(problem.groups().len());

        WorkingSolution {
            problem,
            routes,
            assigned_groups,
        }
    }

    pub fn problem(&self) -> &VehicleRoutingProblem {
        &self.problem
    }

    pub fn routes(&self) -> &[WorkingSolutionRoute] {
        &self.routes
    }

    pub fn route(&self, route_id: RouteIdx) -> &WorkingSolutionRoute {
        &self.routes[route_id.get()]
    }

    pub fn route_ids(&self) -> impl Iterator<Item = RouteIdx> + use<> {
        RouteIdx::range(self.routes.len())
    }

    pub fn is_assigned(&self, group: GroupIdx) -> bool {
        self.assigned_groups.contains(group.get())
    }

    pub fn unassigned_groups(&self) -> impl Iterator<Item = GroupIdx> + '_ {
        self.assigned_groups.zeroes().map(GroupIdx::new)
    }

    pub fn assigned_groups(&self) -> impl Iterator<Item = GroupIdx> + '_ {
        self.assigned_groups.ones().map(GroupIdx::new)
    }

    pub fn has_unassigned(&self) -> bool {
        self.assigned_groups.count_ones(..) < self.problem.groups().len()
    }

    /// Tasks of every unassigned group, in task order.
    pub fn unassigned_tasks(&self) -> Vec<TaskIdx> {
        let mut tasks = self
            .unassigned_groups()
            .flat_map(|group| self.problem.group_tasks(group).iter().copied())
            .collect::<Vec<_>>();
        tasks.sort_unstable();
        tasks
    }

    pub fn total_distance(&self) -> f64 {
        self.routes.iter().map(|route| route.distance()).sum()
    }

    pub fn is_feasible(&self) -> bool {
        self.routes.iter().all(|route| route.is_feasible())
    }

    pub fn route_of(&self, group: GroupIdx) -> Option<RouteIdx> {
        if !self.is_assigned(group) {
            return None;
        }

        self.routes
            .iter()
            .position(|route| route.contains_group(&self.problem, group))
            .map(RouteIdx::new)
    }

    /// Applies an insertion whose schedule was checked by [`crate::solver::insertion`].
    pub fn insert(&mut self, insertion: Insertion) {
        let route = &mut self.routes[insertion.route_id.get()];
        let group = self.problem.group(insertion.group);
        let nodes = merge_at_gaps(route.nodes(), group.nodes(), &insertion.gaps);

        route.replace(nodes, insertion.schedule);
        self.assigned_groups.insert(insertion.group.get());
    }

    /// Removes the group from its route, returns the route it was in.
    pub fn remove_group(&mut self, group: GroupIdx) -> Option<RouteIdx> {
        let route_id = self.route_of(group)?;
        self.routes[route_id.get()].remove_group(&self.problem, group);
        self.assigned_groups.set(group.get(), false);
        Some(route_id)
    }

    /// Replaces the nodes of a route with an evaluated sequence holding the same groups.
    pub fn replace_route(
        &mut self,
        route_id: RouteIdx,
        nodes: Vec<NodeIdx>,
        schedule: RouteSchedule,
    ) {
        self.routes[route_id.get()].replace(nodes, schedule);
    }
}
