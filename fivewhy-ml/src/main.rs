//! fivewhy-train - offline dataset import and model training
//!
//! `import` replaces the record store with a vendor JSON export; `train`
//! fits the root-cause classifier on the stored records and atomically
//! replaces the model artifact.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fivewhy_common::config::{RootFolderInitializer, RootFolderResolver, ServiceConfig, TomlConfig};
use fivewhy_common::db::{self, DistinctField};
use fivewhy_ml::import::load_dataset;
use fivewhy_ml::{Trainer, TrainingConfig};
use tracing::info;

/// Command-line arguments for fivewhy-train
#[derive(Parser, Debug)]
#[command(name = "fivewhy-train")]
#[command(about = "Import equipment failure data and train the root-cause classifier")]
#[command(version)]
struct Args {
    /// Root folder holding the database and model artifact
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to FIVEWHY_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the stored records with a vendor JSON export
    Import {
        /// Dataset file (JSON array)
        file: PathBuf,
    },

    /// Train on the stored records and write the model artifact
    Train {
        /// Seed for every random draw
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Upper bound on cross-validation folds
        #[arg(long, default_value_t = 3)]
        folds: usize,

        /// Fraction of every class held out for evaluation
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,

        /// Artifact path (defaults to <root>/<model_file>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_path = args.config.clone().or_else(TomlConfig::default_path);
    let toml = TomlConfig::load_or_default(toml_path.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml.logging.level)),
        )
        .init();

    info!("Starting fivewhy-train v{}", env!("CARGO_PKG_VERSION"));

    let root_folder = RootFolderResolver::new("fivewhy-train")
        .with_toml(toml.clone())
        .with_cli_arg(args.root_folder.clone())
        .resolve();
    RootFolderInitializer::new(root_folder.clone()).ensure_directory_exists()?;
    let config = ServiceConfig::from_sources(root_folder, &toml)?;
    info!("Database path: {}", config.database_path.display());

    let pool = db::init_database(&config.database_path)
        .await
        .context("Failed to open record store")?;

    match args.command {
        Command::Import { file } => {
            let today = chrono::Local::now().date_naive();
            let records = load_dataset(&file, today)?;
            let inserted = db::replace_all_records(&pool, &records).await?;
            info!("Imported {} records from {}", inserted, file.display());

            info!("Total records: {}", db::count_records(&pool).await?);
            info!(
                "Distinct root causes: {}",
                db::distinct_values(&pool, DistinctField::RootCause).await?.len()
            );
            info!(
                "Distinct equipment types: {}",
                db::distinct_values(&pool, DistinctField::EquipmentType).await?.len()
            );
        }

        Command::Train {
            seed,
            folds,
            test_fraction,
            output,
        } => {
            let records = db::find_all_records(&pool).await?;
            info!("Loaded {} records from the store", records.len());

            let trainer = Trainer::new(TrainingConfig {
                seed,
                cv_folds: folds,
                test_fraction,
                ..Default::default()
            });
            let artifact = tokio::task::spawn_blocking(move || trainer.train(&records))
                .await
                .context("Training task panicked")??;

            let output = output.unwrap_or_else(|| config.model_path.clone());
            artifact.save(&output)?;
            info!(
                "Selected {} with held-out accuracy {:.4}",
                artifact.candidate(),
                artifact.report().accuracy
            );
        }
    }

    Ok(())
}
