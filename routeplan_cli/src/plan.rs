use std::{fs::File, io::BufReader, path::PathBuf};

use clap::Args;
use comfy_table::Table;
use routeplan_matrix_providers::{MemoryCache, TravelMatrixClient};
use routeplan_optimizer::{
    PlanOutcome, json::types::JsonPlanningRequest, plan, solution::types::Solution,
};
use tracing::{info, warn};

use crate::parsers;

#[derive(Args)]
pub struct PlanArgs {
    /// JSON planning request
    #[arg(short, long)]
    input: PathBuf,

    /// Writes the JSON outcome to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, short = 'n')]
    iterations: Option<usize>,

    /// Search timeout (e.g., "30s", "5m", "PT1H30M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,
}

fn summary_table(solution: &Solution) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Vehicle", "Stops", "Tasks", "Distance (km)", "Duration"]);

    for route in &solution.routes {
        let tasks = route
            .visits()
            .map(|stop| stop.task_ids.len())
            .sum::<usize>();
        table.add_row(vec![
            route
                .vehicle_label
                .clone()
                .unwrap_or_else(|| route.vehicle_id.clone()),
            route.visits().count().to_string(),
            tasks.to_string(),
            format!("{:.1}", route.total_distance_m / 1000.0),
            format!(
                "{:#}",
                jiff::SignedDuration::from_secs(route.total_duration_s)
            ),
        ]);
    }

    table
}

pub async fn run(args: PlanArgs) -> anyhow::Result<()> {
    let file = File::open(&args.input)?;
    let mut request: JsonPlanningRequest = serde_json::from_reader(BufReader::new(file))?;

    let search = request.search.get_or_insert_with(Default::default);
    if args.seed.is_some() {
        search.seed = args.seed;
    }
    if args.iterations.is_some() {
        search.iterations = args.iterations;
    }
    if args.timeout.is_some() {
        search.timeout = args.timeout;
    }

    let input = request.into_input();
    let client = TravelMatrixClient::new(input.matrix_provider, MemoryCache::default())?;

    let outcome = plan(
        &input.request,
        &client,
        &input.planning_params,
        &input.search_params,
    )
    .await?;

    match &outcome {
        PlanOutcome::Solved(solution) => {
            info!(
                "Planned {} routes, {:.1} km",
                solution.routes.len(),
                solution.total_distance_m / 1000.0
            );
            eprintln!("{}", summary_table(solution));
        }
        PlanOutcome::Infeasible {
            unassigned_task_ids,
        } => {
            warn!("No feasible plan, unassigned tasks: {:?}", unassigned_task_ids);
        }
    }

    let json = serde_json::to_string_pretty(&outcome)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!("Wrote {:?}", path);
        }
        None => println!("{json}"),
    }

    Ok(())
}
