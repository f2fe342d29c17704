use crate::{
    problem::node_layout::NodeIdx,
    solver::{
        ls::{inter_relocate::InterRelocateOperator, relocate::RelocateOperator},
        schedule::RouteSchedule,
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// New content of a route touched by a move.
#[derive(Debug, Clone)]
pub struct RouteUpdate {
    pub route_id: RouteIdx,
    pub nodes: Vec<NodeIdx>,
    pub schedule: RouteSchedule,
}

pub trait LocalSearchOperator {
    /// Distance delta of the move, negative when the move shortens the solution.
    fn transport_cost_delta(&self, solution: &WorkingSolution) -> f64;

    /// Evaluates every route touched by the move, `None` when one of them becomes
    /// infeasible.
    fn evaluate(&self, solution: &WorkingSolution) -> Option<Vec<RouteUpdate>>;

    fn updated_routes(&self) -> Vec<RouteIdx>;
}

#[derive(Debug)]
pub enum LocalSearchMove {
    /// Moves a node to another position of the same route
    Relocate(RelocateOperator),

    /// Moves a whole group to another route
    InterRelocate(InterRelocateOperator),
}

impl LocalSearchMove {
    pub fn operator_name(&self) -> &'static str {
        match self {
            LocalSearchMove::Relocate(_) => "Relocate",
            LocalSearchMove::InterRelocate(_) => "InterRelocate",
        }
    }

    fn operator(&self) -> &dyn LocalSearchOperator {
        match self {
            LocalSearchMove::Relocate(operator) => operator,
            LocalSearchMove::InterRelocate(operator) => operator,
        }
    }

    pub fn transport_cost_delta(&self, solution: &WorkingSolution) -> f64 {
        self.operator().transport_cost_delta(solution)
    }

    pub fn evaluate(&self, solution: &WorkingSolution) -> Option<Vec<RouteUpdate>> {
        self.operator().evaluate(solution)
    }

    pub fn updated_routes(&self) -> Vec<RouteIdx> {
        self.operator().updated_routes()
    }
}

/// Writes evaluated route updates into the solution.
pub fn apply_updates(solution: &mut WorkingSolution, updates: Vec<RouteUpdate>) {
    for update in updates {
        solution.replace_route(update.route_id, update.nodes, update.schedule);
    }
}
