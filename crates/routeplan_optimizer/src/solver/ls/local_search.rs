use tracing::{debug, instrument};

use crate::solver::{
    ls::{
        inter_relocate::InterRelocateOperator,
        r#move::{LocalSearchMove, RouteUpdate, apply_updates},
        relocate::RelocateOperator,
    },
    search_params::SearchClock,
    solution::working_solution::WorkingSolution,
};

/// Smallest distance gain that counts as an improvement
const MIN_IMPROVEMENT: f64 = 1e-6;

/// First-improvement descent over intra-route relocate and inter-route group relocate.
pub struct LocalSearch {
    max_moves: usize,
}

impl Default for LocalSearch {
    fn default() -> Self {
        LocalSearch { max_moves: 1000 }
    }
}

impl LocalSearch {
    pub fn new(max_moves: usize) -> Self {
        LocalSearch { max_moves }
    }

    /// Applies improving moves until none is left, the move limit is reached or the clock
    /// runs out. Returns the number of applied moves.
    #[instrument(skip_all, level = "debug")]
    pub fn run(&self, solution: &mut WorkingSolution, clock: &SearchClock) -> usize {
        let mut applied = 0;

        while applied < self.max_moves && !clock.is_exhausted() {
            let Some((applied_move, updates)) = self.find_improving_move(solution) else {
                break;
            };

            debug!(
                operator = applied_move.operator_name(),
                delta = applied_move.transport_cost_delta(solution),
                routes = ?applied_move.updated_routes(),
                "Applying local search move"
            );
            apply_updates(solution, updates);
            applied += 1;
        }

        applied
    }

    fn find_improving_move(
        &self,
        solution: &WorkingSolution,
    ) -> Option<(LocalSearchMove, Vec<RouteUpdate>)> {
        for route_id in solution.route_ids() {
            let mut found = None;
            RelocateOperator::generate_moves(solution, route_id, |operator| {
                if found.is_some() {
                    return;
                }

                let candidate = LocalSearchMove::Relocate(operator);
                if candidate.transport_cost_delta(solution) < -MIN_IMPROVEMENT
                    && let Some(updates) = candidate.evaluate(solution)
                {
                    found = Some((candidate, updates));
                }
            });

            if found.is_some() {
                return found;
            }
        }

        for group in solution.assigned_groups() {
            let Some(from_route_id) = solution.route_of(group) else {
                continue;
            };

            for to_route_id in solution.route_ids() {
                let Some(operator) = InterRelocateOperator::best_move(
                    solution,
                    group,
                    from_route_id,
                    to_route_id,
                    -MIN_IMPROVEMENT,
                ) else {
                    continue;
                };

                let candidate = LocalSearchMove::InterRelocate(operator);
                if let Some(updates) = candidate.evaluate(solution) {
                    return Some((candidate, updates));
                }
            }
        }

        None
    }
}
