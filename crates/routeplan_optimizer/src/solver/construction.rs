use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    error::SearchError,
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        insertion::Insertion, insertion_cache::InsertionCache, search_params::SearchClock,
        solution::working_solution::WorkingSolution,
    },
};

/// Regret of a group that fits in a single route
const SINGLE_ROUTE_REGRET: f64 = f64::MAX;

/// Repeatedly applies the cheapest feasible insertion among all unassigned groups.
///
/// Returns `false` when the clock ran out before every insertable group was placed. Groups
/// that fit nowhere are left unassigned.
pub fn cheapest_insertion(
    solution: &mut WorkingSolution,
    cache: &mut InsertionCache,
    clock: &SearchClock,
) -> bool {
    while solution.has_unassigned() {
        if clock.is_exhausted() {
            return false;
        }

        let mut best: Option<Insertion> = None;
        let unassigned = solution.unassigned_groups().collect::<Vec<_>>();
        for group in unassigned {
            for route_id in solution.route_ids() {
                if let Some(insertion) = cache.best_route_insertion(solution, route_id, group)
                    && best
                        .as_ref()
                        .is_none_or(|best| insertion.delta < best.delta)
                {
                    best = Some(insertion);
                }
            }
        }

        let Some(insertion) = best else {
            break;
        };
        solution.insert(insertion);
        cache.clear(solution.routes());
    }

    true
}

/// Repeatedly inserts the group with the largest gap between its best and second best
/// route, at its best route.
///
/// Same return value as [`cheapest_insertion`].
pub fn regret_insertion(
    solution: &mut WorkingSolution,
    cache: &mut InsertionCache,
    clock: &SearchClock,
) -> bool {
    while solution.has_unassigned() {
        if clock.is_exhausted() {
            return false;
        }

        let mut best: Option<(f64, Insertion)> = None;
        let unassigned = solution.unassigned_groups().collect::<Vec<_>>();
        for group in unassigned {
            let mut first: Option<Insertion> = None;
            let mut second_delta = f64::INFINITY;

            for route_id in solution.route_ids() {
                let Some(insertion) = cache.best_route_insertion(solution, route_id, group) else {
                    continue;
                };

                match first.take() {
                    Some(current) if insertion.delta >= current.delta => {
                        second_delta = second_delta.min(insertion.delta);
                        first = Some(current);
                    }
                    Some(current) => {
                        second_delta = second_delta.min(current.delta);
                        first = Some(insertion);
                    }
                    None => first = Some(insertion),
                }
            }

            let Some(first) = first else {
                continue;
            };
            let regret = if second_delta.is_finite() {
                second_delta - first.delta
            } else {
                SINGLE_ROUTE_REGRET
            };

            if best
                .as_ref()
                .is_none_or(|(best_regret, _)| regret > *best_regret)
            {
                best = Some((regret, first));
            }
        }

        let Some((_, insertion)) = best else {
            break;
        };
        solution.insert(insertion);
        cache.clear(solution.routes());
    }

    true
}

/// Ids of the tasks served by unassigned groups, in task order.
pub fn unassigned_task_ids(solution: &WorkingSolution) -> Vec<String> {
    let layout = solution.problem().layout();
    solution
        .unassigned_tasks()
        .into_iter()
        .map(|task| layout.task(task).id.clone())
        .collect()
}

/// Builds a solution serving every group: cheapest insertion first, regret insertion from
/// scratch when cheapest insertion leaves groups unassigned.
#[instrument(skip_all, level = "debug")]
pub fn construct_solution(
    problem: Arc<VehicleRoutingProblem>,
    clock: &SearchClock,
) -> Result<WorkingSolution, SearchError> {
    let mut solution = WorkingSolution::new(Arc::clone(&problem));
    if !cheapest_insertion(&mut solution, &mut InsertionCache::new(), clock) {
        return Err(SearchError::Timeout);
    }

    if solution.has_unassigned() {
        let unassigned = solution.unassigned_groups().count();
        debug!(unassigned, "Cheapest insertion left groups unassigned, trying regret insertion");

        let mut regret_solution = WorkingSolution::new(problem);
        if !regret_insertion(&mut regret_solution, &mut InsertionCache::new(), clock) {
            return Err(SearchError::Timeout);
        }

        if regret_solution.unassigned_groups().count() < unassigned {
            solution = regret_solution;
        }
    }

    if solution.has_unassigned() {
        return Err(SearchError::Infeasible {
            unassigned_task_ids: unassigned_task_ids(&solution),
        });
    }

    debug!(
        distance = solution.total_distance(),
        "Initial solution built"
    );

    Ok(solution)
}
