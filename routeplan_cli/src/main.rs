use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::plan::PlanArgs;

mod parsers;
mod plan;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plans the routes of a JSON planning request
    Plan {
        #[command(flatten)]
        args: PlanArgs,
    },

    /// Prints the JSON schema of a planning request
    Schema,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Plan { args }) => plan::run(args).await?,
        Some(Commands::Schema) => {
            println!("{}", routeplan_optimizer::json::schema::generate_json_schema()?)
        }
        None => {}
    }

    Ok(())
}
