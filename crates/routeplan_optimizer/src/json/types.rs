use jiff::{
    SignedDuration,
    civil::{Date, Time},
};
use routeplan_matrix_providers::TravelMatrixProvider;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    planner::PlanningRequest,
    problem::{
        location::Location,
        planning_params::{BreakRule, PlanningParams},
        task::Task,
        vehicle::Vehicle,
    },
    solver::search_params::{SearchParams, Termination},
};

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "PlanningRequest")]
pub struct JsonPlanningRequest {
    pub depot_id: String,

    /// Day the routes are driven
    pub planned_date: Option<Date>,

    pub locations: Vec<Location>,
    pub tasks: Vec<Task>,
    pub vehicles: Vec<Vehicle>,

    /// Defaults to straight line distances driven at 40 km/h
    pub matrix_provider: Option<TravelMatrixProvider>,

    pub planning: Option<JsonPlanningParams>,
    pub search: Option<JsonSearchParams>,
}

#[derive(Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "PlanningParams")]
pub struct JsonPlanningParams {
    pub depot_opening: Option<Time>,
    pub depot_closing: Option<Time>,
    pub max_route_duration: Option<SignedDuration>,
    pub break_rule: Option<JsonBreakRule>,

    /// Plans the routes without the mandatory break
    pub disable_break: Option<bool>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "BreakRule")]
pub struct JsonBreakRule {
    pub window_start: Time,
    pub window_end: Time,
    pub duration: SignedDuration,
}

impl From<JsonBreakRule> for BreakRule {
    fn from(value: JsonBreakRule) -> Self {
        BreakRule {
            window_start: value.window_start,
            window_end: value.window_end,
            duration: value.duration,
        }
    }
}

#[derive(Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields, rename = "SearchParams")]
pub struct JsonSearchParams {
    pub seed: Option<u64>,
    pub iterations: Option<usize>,
    pub iterations_without_improvement: Option<usize>,
    pub timeout: Option<SignedDuration>,
    pub local_search: Option<bool>,
}

fn replace_termination(terminations: &mut Vec<Termination>, termination: Termination) {
    terminations.retain(|existing| {
        std::mem::discriminant(existing) != std::mem::discriminant(&termination)
    });
    terminations.push(termination);
}

impl JsonPlanningParams {
    pub fn into_params(self, planned_date: Option<Date>) -> PlanningParams {
        let mut params = PlanningParams {
            planned_date,
            ..PlanningParams::default()
        };

        if let Some(depot_opening) = self.depot_opening {
            params.depot_opening = depot_opening;
        }

        if let Some(depot_closing) = self.depot_closing {
            params.depot_closing = depot_closing;
        }

        if let Some(max_route_duration) = self.max_route_duration {
            params.max_route_duration = max_route_duration;
        }

        if let Some(break_rule) = self.break_rule {
            params.break_rule = Some(break_rule.into());
        }

        if self.disable_break == Some(true) {
            params.break_rule = None;
        }

        params
    }
}

impl JsonSearchParams {
    pub fn into_params(self) -> SearchParams {
        let mut params = SearchParams::default();

        if let Some(seed) = self.seed {
            params.seed = seed;
        }

        if let Some(iterations) = self.iterations {
            replace_termination(&mut params.terminations, Termination::Iterations(iterations));
        }

        if let Some(iterations) = self.iterations_without_improvement {
            replace_termination(
                &mut params.terminations,
                Termination::IterationsWithoutImprovement(iterations),
            );
        }

        if let Some(timeout) = self.timeout {
            replace_termination(&mut params.terminations, Termination::Duration(timeout));
        }

        if let Some(local_search) = self.local_search {
            params.enable_local_search = local_search;
        }

        params
    }
}

/// Everything a planning call needs, split out of a request document.
pub struct PlanningInput {
    pub request: PlanningRequest,
    pub planning_params: PlanningParams,
    pub search_params: SearchParams,
    pub matrix_provider: TravelMatrixProvider,
}

impl JsonPlanningRequest {
    pub fn into_input(self) -> PlanningInput {
        PlanningInput {
            request: PlanningRequest {
                depot_id: self.depot_id,
                locations: self.locations,
                tasks: self.tasks,
                vehicles: self.vehicles,
            },
            planning_params: self
                .planning
                .unwrap_or_default()
                .into_params(self.planned_date),
            search_params: self.search.unwrap_or_default().into_params(),
            matrix_provider: self.matrix_provider.unwrap_or_default(),
        }
    }
}
