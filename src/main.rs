//! Neuron Projector
//!
//! Places flattened 2D neuron measurements onto a 3D organ surface mesh.
//!
//! CLI commands:
//! - project: Project configured datasets and write a scene file
//! - profiles: List schema profiles and datasets
//! - search: Search the remote dataset catalog
//! - download: Download and unpack a dataset archive
//! - tree: Show the folder structure of a downloaded dataset

mod catalog;
mod config;
mod dataset;
mod logging;
mod mesh;
mod pipeline;
mod projection;
mod scene;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "neuron_projector")]
#[command(about = "Project flattened neuron measurements onto a 3D surface mesh")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to projection.yaml config
    #[arg(short, long, default_value = "projection.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Project all configured datasets onto the mesh
    Project {
        /// Output scene file
        #[arg(short, long, default_value = "scene.json")]
        output: PathBuf,

        /// Override the mesh path from the config
        #[arg(long)]
        mesh: Option<PathBuf>,

        /// Jitter seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Hide a layer by dataset ID (repeatable)
        #[arg(long)]
        hide: Vec<String>,

        /// Only project this dataset ID (repeatable)
        #[arg(long)]
        dataset: Vec<String>,

        /// Apply the side shift without random jitter
        #[arg(long)]
        no_jitter: bool,
    },

    /// List schema profiles and datasets
    Profiles,

    /// Search the dataset catalog
    Search {
        /// Keyword to search for
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Download a dataset archive and unpack it into the data directory
    Download {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        version: u64,
    },

    /// Print the folder structure of a downloaded dataset
    Tree {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        version: u64,

        /// Maximum depth to list
        #[arg(long, default_value = "3")]
        depth: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let secrets = config::Secrets::load();

    // Initialize logging first
    logging::init_logging(&secrets.log_dir)?;
    tracing::info!("Neuron Projector starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        config::Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        config::Config::default()
    };
    tracing::info!(
        "Config loaded: {} profiles, {} datasets",
        config.profiles.len(),
        config.datasets.len()
    );

    let data_dir = PathBuf::from(&secrets.data_dir);

    match cli.command {
        Commands::Project {
            output,
            mesh,
            seed,
            hide,
            dataset,
            no_jitter,
        } => {
            let options = ProjectOptions {
                mesh,
                seed,
                hide,
                only: dataset,
                no_jitter,
            };
            project(config, &data_dir, &output, options)?;
        }

        Commands::Profiles => {
            list_profiles(&config);
        }

        Commands::Search { query, limit } => {
            let hits = catalog::search_datasets(&secrets.api_base, &query, limit).await?;
            println!("Found {} datasets for '{}':", hits.len(), query);
            for hit in hits {
                println!("  [{} v{}] {}", hit.id, hit.version, hit.name);
                if !hit.tags.is_empty() {
                    println!("      tags: {}", hit.tags.join(", "));
                }
            }
        }

        Commands::Download { id, version } => {
            let path = catalog::download_dataset(&secrets.api_base, id, version, &data_dir).await?;
            println!("Unpacked dataset to {:?}", path);
        }

        Commands::Tree { id, version, depth } => {
            let root = data_dir.join(catalog::dataset_dir_name(id, version));
            if !root.is_dir() {
                anyhow::bail!(
                    "Dataset folder not found: {:?} (run `download --id {} --version {}` first)",
                    root,
                    id,
                    version
                );
            }
            for line in catalog::folder_tree(&root, depth)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Command-line overrides for a projection run
struct ProjectOptions {
    mesh: Option<PathBuf>,
    seed: Option<u64>,
    hide: Vec<String>,
    only: Vec<String>,
    no_jitter: bool,
}

/// Run the full pipeline and write the scene
fn project(
    mut config: config::Config,
    data_dir: &std::path::Path,
    output: &std::path::Path,
    options: ProjectOptions,
) -> anyhow::Result<()> {
    if let Some(path) = options.mesh {
        config.mesh.path = path;
    }

    if !options.only.is_empty() {
        let mut selected = Vec::with_capacity(options.only.len());
        for id in &options.only {
            let dataset = config
                .get_dataset(id)
                .ok_or_else(|| anyhow::anyhow!("Unknown dataset: {}", id))?;
            selected.push(dataset.clone());
        }
        config.datasets = selected;
    }

    if options.no_jitter {
        tracing::info!("Jitter disabled, applying side shifts only");
        config.sides = config.sides.without_jitter();
    }

    let rng = match options.seed.or(config.seed) {
        Some(seed) => {
            tracing::info!("Using jitter seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let mesh_path = data_dir.join(&config.mesh.path);
    let mesh = mesh::Mesh::from_stl(&mesh_path)?;

    let mut pipeline = pipeline::Pipeline::new(config, mesh, rng)?;
    let index = pipeline.index();
    let bounds = index.bounds();
    println!(
        "Mesh: {} unique vertices, {} ventral (x < {}), {} dorsal (x > {})",
        index.len(),
        index.candidates(projection::Side::Ventral).len(),
        bounds.ventral_max,
        index.candidates(projection::Side::Dorsal).len(),
        bounds.dorsal_min
    );

    let mut scene = pipeline.run(data_dir)?;
    scene.hide(&options.hide);
    scene.write_json(output)?;

    for layer in &scene.layers {
        println!(
            "  [{}] {} ({} points){}",
            layer.id,
            layer.name,
            layer.points.len(),
            if layer.visible { "" } else { " hidden" }
        );
    }
    println!("Scene written to {:?}", output);
    Ok(())
}

/// List profiles and the datasets that use them
fn list_profiles(config: &config::Config) {
    let mut names: Vec<_> = config.profiles.keys().collect();
    names.sort();

    println!("Schema profiles ({}):", names.len());
    for name in names {
        let profile = &config.profiles[name];
        println!(
            "## {} (vertical: {:?}, depth: {:?}, face {})",
            name,
            profile.vertical_axis,
            profile.depth_axis,
            if profile.require_face { "required" } else { "optional" }
        );

        let mut columns: Vec<_> = profile.columns.iter().collect();
        columns.sort();
        for (raw, canonical) in columns {
            println!("  {} -> {}", raw, canonical);
        }

        for dataset in config.datasets.iter().filter(|d| &d.profile == name) {
            println!("  - {} [{}] ({:?})", dataset.name, dataset.id, dataset.file);
        }
    }
}
