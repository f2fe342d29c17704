use crate::{
    problem::node_group::GroupIdx,
    solver::{
        insertion::{Insertion, best_route_insertion, candidate_gaps},
        ls::r#move::{LocalSearchOperator, RouteUpdate},
        schedule::merge_at_gaps,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// **Inter-Route Group Relocate**
///
/// Moves every node of a group from `from_route_id` to its cheapest feasible position in
/// `to_route_id`.
///
/// ```text
/// BEFORE:
///    R1: ... (A) -> [g1] -> (B) ... (C) -> [g2] -> (D) ...
///    R2: ... (X) -> (Y) ...
///
/// AFTER:
///    R1: ... (A) -> (B) ... (C) -> (D) ...
///    R2: ... (X) -> [g1] -> [g2] -> (Y) ...
/// ```
#[derive(Debug)]
pub struct InterRelocateOperator {
    from_route_id: RouteIdx,
    insertion: Insertion,
}

impl InterRelocateOperator {
    /// Best relocation of `group` into `to_route_id`, `None` when the group fits nowhere in
    /// that route or the move cannot shorten the solution by more than `threshold`.
    pub fn best_move(
        solution: &WorkingSolution,
        group: GroupIdx,
        from_route_id: RouteIdx,
        to_route_id: RouteIdx,
        threshold: f64,
    ) -> Option<Self> {
        if from_route_id == to_route_id {
            return None;
        }

        let removal_delta = removal_delta(solution, group, from_route_id);

        // candidates are sorted, the first one bounds every feasible insertion
        let problem = solution.problem();
        let lower_bound = candidate_gaps(
            problem,
            solution.route(to_route_id).nodes(),
            problem.group(group).nodes(),
        )
        .first()
        .map(|(delta, _)| *delta)?;
        if removal_delta + lower_bound >= threshold {
            return None;
        }

        let insertion = best_route_insertion(solution, to_route_id, group)?;
        (removal_delta + insertion.delta < threshold).then_some(InterRelocateOperator {
            from_route_id,
            insertion,
        })
    }
}

/// Distance delta of taking `group` out of its route.
fn removal_delta(solution: &WorkingSolution, group: GroupIdx, route_id: RouteIdx) -> f64 {
    let problem = solution.problem();
    let route = solution.route(route_id);
    let remaining = route
        .nodes()
        .iter()
        .copied()
        .filter(|&node| problem.group_of(node) != Some(group))
        .collect::<Vec<_>>();

    problem.route_distance(&remaining) - route.distance()
}

impl LocalSearchOperator for InterRelocateOperator {
    fn transport_cost_delta(&self, solution: &WorkingSolution) -> f64 {
        removal_delta(solution, self.insertion.group, self.from_route_id) + self.insertion.delta
    }

    fn evaluate(&self, solution: &WorkingSolution) -> Option<Vec<RouteUpdate>> {
        let problem = solution.problem();
        let group = self.insertion.group;

        let from_route = solution.route(self.from_route_id);
        let from_nodes = from_route
            .nodes()
            .iter()
            .copied()
            .filter(|&node| problem.group_of(node) != Some(group))
            .collect::<Vec<_>>();
        let from_schedule = from_route.evaluate(problem, &from_nodes)?;

        let to_nodes = merge_at_gaps(
            solution.route(self.insertion.route_id).nodes(),
            problem.group(group).nodes(),
            &self.insertion.gaps,
        );

        Some(vec![
            RouteUpdate {
                route_id: self.from_route_id,
                nodes: from_nodes,
                schedule: from_schedule,
            },
            RouteUpdate {
                route_id: self.insertion.route_id,
                nodes: to_nodes,
                schedule: self.insertion.schedule.clone(),
            },
        ])
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.from_route_id, self.insertion.route_id]
    }
}
