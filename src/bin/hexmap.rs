//! Semantic hexmap CLI
//!
//! Runs placement and theme assignment on JSON input from a file or stdin.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use semantic_hexmap::clustering::{assign_items_to_themes, Theme};
use semantic_hexmap::config::EngineSettings;
use semantic_hexmap::projection::{
    neighbor_projector_factory, passthrough_projector_factory, ProjectorFactory,
};
use semantic_hexmap::types::EmbeddingItem;
use semantic_hexmap::worker::{PlacementSession, WorkerMessage};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Semantic hexmap - lay out embedded stories on a hex grid
#[derive(Parser)]
#[command(name = "hexmap")]
#[command(about = "Place embedded items on a hexagonal grid by semantic similarity", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, env = "HEXMAP_SETTINGS")]
    settings: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a computePlacement request and print the response message
    Place {
        /// Request file (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Projection backend
        #[arg(long, value_enum, default_value_t = ProjectorKind::Neighbor)]
        projector: ProjectorKind,

        /// Pretty-print output
        #[arg(long)]
        pretty: bool,
    },

    /// Assign items to themes with k-means over cosine distance
    Themes {
        /// Input file with `items` and `themes` (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Pretty-print output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProjectorKind {
    /// Built-in neighbor-graph projection
    Neighbor,
    /// Embeddings are already 2D
    Passthrough,
}

impl ProjectorKind {
    fn factory(self) -> ProjectorFactory {
        match self {
            Self::Neighbor => neighbor_projector_factory(),
            Self::Passthrough => passthrough_projector_factory(),
        }
    }
}

/// Input for the `themes` subcommand.
#[derive(Deserialize)]
struct ThemesInput {
    items: Vec<EmbeddingItem>,
    themes: Vec<Theme>,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

async fn cmd_place(
    settings: &EngineSettings,
    input: Option<&Path>,
    projector: ProjectorKind,
    pretty: bool,
) -> anyhow::Result<()> {
    let raw = read_input(input)?;
    let (items, bounds, config) = match WorkerMessage::from_frame(&raw)? {
        WorkerMessage::ComputePlacement {
            items,
            bounds,
            config,
            ..
        } => (items, bounds, config),
        other => bail!("Expected a computePlacement request, got {}", other.kind()),
    };

    let mut session = PlacementSession::new(Some(projector.factory()), settings)?;
    let response = match session.compute_placement(items, bounds, config).await {
        Ok(result) => {
            if !result.is_complete() {
                tracing::warn!(unplaced = result.unplaced.len(), "Some items could not be placed");
            }
            WorkerMessage::placement_result(None, result)
        }
        Err(e) => WorkerMessage::error(None, e.to_string()),
    };

    let failed = matches!(response, WorkerMessage::Error { .. });
    print_json(&response, pretty)?;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_themes(settings: &EngineSettings, input: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let raw = read_input(input)?;
    let input: ThemesInput = serde_json::from_str(&raw).context("Invalid themes input")?;

    let ids: Vec<String> = input.items.iter().map(|item| item.id.clone()).collect();
    let embeddings: HashMap<String, Vec<f32>> = input
        .items
        .into_iter()
        .map(|item| (item.id, item.vector))
        .collect();

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let assignment =
        assign_items_to_themes(&ids, &embeddings, &input.themes, &settings.kmeans(), &mut rng)?;

    print_json(&assignment, pretty)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = EngineSettings::load(cli.settings.as_deref())?;

    match cli.command {
        Commands::Place {
            input,
            projector,
            pretty,
        } => cmd_place(&settings, input.as_deref(), projector, pretty).await?,
        Commands::Themes { input, pretty } => cmd_themes(&settings, input.as_deref(), pretty)?,
    }

    Ok(())
}
