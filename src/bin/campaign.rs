#![forbid(unsafe_code)]

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use campaign_planner::config::PlannerConfig;
use campaign_planner::pipeline::Planner;
use campaign_planner::server;
use campaign_planner::steps::allocator::allocate_budget;

#[derive(Parser)]
#[command(name = "campaign", version, about = "Campaign planner CLI")]
struct Cli {
    /// Planner config (TOML)
    #[arg(long, global = true, env = "CAMPAIGN_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Generate a plan for one request file
    Plan {
        #[arg(long)]
        request: PathBuf,
        /// Write the plan here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Split a budget across channels without calling any model
    Allocate {
        #[arg(long)]
        budget: i64,
        #[arg(long = "channel", required = true)]
        channels: Vec<String>,
        /// Previous campaign summary text
        #[arg(long, default_value = "")]
        history: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("campaign_planner=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let mut config = PlannerConfig::load(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let addr: SocketAddr = config.server.bind.parse()?;
            let planner = Arc::new(Planner::from_config(config));
            server::serve(planner, addr).await?;
        }
        Commands::Plan { request, out } => {
            let config = PlannerConfig::load(cli.config.as_deref())?;
            let raw: serde_json::Value = read_json(&request)?;
            let planner = Planner::from_config(config);
            let plan = planner.plan(&raw).await?;
            match out {
                Some(path) => {
                    write_json(&path, &plan)?;
                    eprintln!("plan written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&plan)?),
            }
        }
        Commands::Allocate {
            budget,
            channels,
            history,
        } => {
            let split = allocate_budget(budget, &channels, &history);
            println!("{}", serde_json::to_string_pretty(&split)?);
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
