use std::sync::Arc;

use rand::{SeedableRng, rngs::SmallRng};
use tracing::{debug, info, instrument};

use crate::{
    error::SearchError,
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        construction::{cheapest_insertion, construct_solution},
        insertion_cache::InsertionCache,
        ls::local_search::LocalSearch,
        ruin::ruin_random,
        search_params::{SearchClock, SearchParams, Termination},
        solution::working_solution::WorkingSolution,
    },
};

/// Distance differences below this are ties
const DISTANCE_EPSILON: f64 = 1e-6;

struct SearchState {
    iteration: usize,
    iterations_without_improvement: usize,
}

fn check_termination(state: &SearchState, clock: &SearchClock, termination: &Termination) -> bool {
    match *termination {
        Termination::Iterations(max_iterations) => state.iteration >= max_iterations,
        Termination::IterationsWithoutImprovement(max_iterations) => {
            state.iterations_without_improvement >= max_iterations
        }
        Termination::Duration(max_duration) => clock.elapsed() > max_duration,
    }
}

/// Builds an initial solution then improves it with local search and seeded ruin and
/// recreate until a termination is reached.
///
/// Fails when the initial solution cannot serve every group or when the clock runs out
/// before it is built. Once an initial solution exists, the best solution found is
/// returned whatever stops the search.
#[instrument(skip_all, level = "debug")]
pub fn solve(
    problem: Arc<VehicleRoutingProblem>,
    params: &SearchParams,
) -> Result<WorkingSolution, SearchError> {
    let clock = SearchClock::start(params);
    let mut current = construct_solution(problem, &clock)?;

    let local_search = LocalSearch::default();
    if params.enable_local_search {
        local_search.run(&mut current, &clock);
    }

    let mut best = current.clone();
    let mut rng = SmallRng::seed_from_u64(params.seed);
    let mut state = SearchState {
        iteration: 0,
        iterations_without_improvement: 0,
    };

    let has_groups = current.assigned_groups().next().is_some();
    while has_groups
        && !params
            .terminations
            .iter()
            .any(|termination| check_termination(&state, &clock, termination))
    {
        state.iteration += 1;
        state.iterations_without_improvement += 1;

        let mut candidate = current.clone();
        ruin_random(&mut candidate, &params.ruin, &mut rng);
        if !cheapest_insertion(&mut candidate, &mut InsertionCache::new(), &clock) {
            break;
        }
        if candidate.has_unassigned() {
            continue;
        }
        if params.enable_local_search {
            local_search.run(&mut candidate, &clock);
        }

        let distance = candidate.total_distance();
        if candidate.is_feasible() && distance <= current.total_distance() + DISTANCE_EPSILON {
            current = candidate;

            if distance < best.total_distance() - DISTANCE_EPSILON {
                debug!(iteration = state.iteration, distance, "New best solution");
                best = current.clone();
                state.iterations_without_improvement = 0;
            }
        }
    }

    info!(
        iterations = state.iteration,
        distance = best.total_distance(),
        elapsed_ms = clock.elapsed().as_millis(),
        "Search finished"
    );

    Ok(best)
}
