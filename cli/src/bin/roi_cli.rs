use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cli::{SceneRunner, catalog_entries, export_rois};
use color_eyre::eyre::Result;
use roi_bridge::{ConverterCatalog, Scene};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every item of a scene file
    Convert {
        /// Path to the TOML or JSON scene
        #[arg(short, long)]
        scene: PathBuf,
        /// Write converted rois to this GeoJSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the registered converters in matching order
    Catalog,
    /// Print the JSON schema of scene files
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Convert { scene, output } => convert(scene, output.as_deref())?,
        Commands::Catalog => {
            let entries = catalog_entries(&ConverterCatalog::global());
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&Scene::json_schema())?);
        }
    }

    Ok(())
}

fn convert(scene_path: &Path, output: Option<&Path>) -> Result<()> {
    let runner = SceneRunner::from_file(scene_path)?;
    info!("Loaded {} scene items from {:?}", runner.scene().items.len(), scene_path);

    let (report, rois) = runner.run()?;
    println!("{}", report.to_json()?);

    if report.failures() > 0 {
        warn!("{} of {} items failed", report.failures(), report.items.len());
    }

    if let Some(path) = output {
        export_rois(&rois, path)?;
        info!("Wrote {} rois to {:?}", rois.len(), path);
    }

    Ok(())
}
