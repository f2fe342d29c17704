use crate::{
    problem::node_layout::{DEPOT, NodeIdx},
    solver::{
        ls::r#move::{LocalSearchOperator, RouteUpdate},
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// **Intra-Route Relocate**
///
/// Takes the node at `from` out of the route and inserts it at index `to` of the remaining
/// sequence.
///
/// ```text
/// BEFORE:
///    Route: ... (A) -> [from] -> (C) ... (X) -> (Y) ...
///
/// AFTER:
///    Route: ... (A) -> (C) ... (X) -> [from] -> (Y) ...
/// ```
#[derive(Debug)]
pub struct RelocateOperator {
    params: RelocateOperatorParams,
}

#[derive(Debug)]
pub struct RelocateOperatorParams {
    pub route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl RelocateOperator {
    pub fn new(params: RelocateOperatorParams) -> Self {
        RelocateOperator { params }
    }

    /// Every move that changes the order of the route.
    pub fn generate_moves(
        solution: &WorkingSolution,
        route_id: RouteIdx,
        mut consumer: impl FnMut(Self),
    ) {
        let len = solution.route(route_id).len();
        for from in 0..len {
            for to in 0..len {
                if from != to {
                    consumer(RelocateOperator::new(RelocateOperatorParams {
                        route_id,
                        from,
                        to,
                    }));
                }
            }
        }
    }

    fn relocated(&self, nodes: &[NodeIdx]) -> Vec<NodeIdx> {
        let mut relocated = nodes.to_vec();
        let node = relocated.remove(self.params.from);
        relocated.insert(self.params.to, node);
        relocated
    }
}

impl LocalSearchOperator for RelocateOperator {
    fn transport_cost_delta(&self, solution: &WorkingSolution) -> f64 {
        let problem = solution.problem();
        let nodes = solution.route(self.params.route_id).nodes();
        let RelocateOperatorParams { from, to, .. } = self.params;

        let at = |position: Option<usize>| {
            position
                .and_then(|position| nodes.get(position).copied())
                .unwrap_or(DEPOT)
        };
        // node at `position` once `from` is taken out
        let remaining = |position: usize| {
            if position < from {
                at(Some(position))
            } else {
                at(Some(position + 1))
            }
        };

        let node = nodes[from];
        let a = at(from.checked_sub(1));
        let c = at(Some(from + 1));
        let x = if to == 0 { DEPOT } else { remaining(to - 1) };
        let y = remaining(to);

        problem.distance(a, c) - problem.distance(a, node) - problem.distance(node, c)
            + problem.distance(x, node)
            + problem.distance(node, y)
            - problem.distance(x, y)
    }

    fn evaluate(&self, solution: &WorkingSolution) -> Option<Vec<RouteUpdate>> {
        let route = solution.route(self.params.route_id);
        let nodes = self.relocated(route.nodes());
        let schedule = route.evaluate(solution.problem(), &nodes)?;

        Some(vec![RouteUpdate {
            route_id: self.params.route_id,
            nodes,
            schedule,
        }])
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}
