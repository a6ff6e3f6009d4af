//! docmeta-ingest - Parquet image metadata loader
//!
//! Subcommands:
//! - `load`: populate `document_metadata` from a parquet directory
//! - `check`: inspect parquet files without touching the database
//! - `stats`: label and size statistics of the stored metadata
//! - `query`: look records up by label, file or size range
//! - `estimate`: labeled image sample size for a target margin of error

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use docmeta_common::config::{CompiledDefaults, RootFolderInitializer, RootFolderResolver, TomlConfig};
use docmeta_common::db::{self, DocumentMetadata, SizeRange};
use docmeta_common::time;
use docmeta_ingest::estimate::{self, SampleSizeEstimator};
use docmeta_ingest::inspect::inspect_directory;
use docmeta_ingest::report::DatabaseReport;
use docmeta_ingest::{MetadataLoader, ParquetImageReader, ParquetScanner, ReplaceMode};
use sqlx::SqlitePool;
use tracing::{info, warn};

const MODULE_NAME: &str = "ingest";

#[derive(Parser, Debug)]
#[command(name = "docmeta-ingest")]
#[command(about = "Load and inspect parquet image metadata")]
#[command(version)]
struct Cli {
    /// Folder holding docmeta.db
    #[arg(long, global = true, env = "DOCMETA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Database file (overrides --root-folder)
    #[arg(long, global = true, env = "DOCMETA_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load parquet metadata into the database
    Load {
        #[command(flatten)]
        source: SourceArgs,

        /// Reject rows that are already stored instead of replacing the file
        #[arg(long)]
        strict: bool,

        /// Rows per parquet record batch
        #[arg(long, default_value_t = docmeta_ingest::reader::DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },

    /// Report rows, labels and image sizes of the parquet files
    Check {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        json: bool,
    },

    /// Show statistics of the stored metadata
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Look up stored records
    #[command(group(
        ArgGroup::new("selector")
            .required(true)
            .multiple(true)
            .args(["label", "file", "min_size", "max_size"])
    ))]
    Query {
        #[arg(long, conflicts_with_all = ["file", "min_size", "max_size"])]
        label: Option<i64>,

        /// Stored file key, e.g. train-00000.parquet or a/train.parquet
        #[arg(long, conflicts_with_all = ["min_size", "max_size"])]
        file: Option<String>,

        /// Minimum image size in bytes (inclusive)
        #[arg(long)]
        min_size: Option<i64>,

        /// Maximum image size in bytes (inclusive)
        #[arg(long)]
        max_size: Option<i64>,

        /// Maximum records to print
        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Estimate how many labeled images are needed per detection class
    Estimate {
        /// Comma-separated class:boxes_per_image pairs
        #[arg(long, default_value = estimate::DEFAULT_CLASS_BOXES)]
        class_boxes: String,

        /// Two-sided confidence level (fraction or percentage)
        #[arg(long, default_value_t = estimate::DEFAULT_CONFIDENCE)]
        confidence: f64,

        /// Desired margin of error (fraction)
        #[arg(long, default_value_t = estimate::DEFAULT_MARGIN)]
        margin: f64,

        /// Assumed per-class detection rate; 0.5 is the most conservative
        #[arg(long, default_value_t = estimate::DEFAULT_BASE_RATE)]
        base_rate: f64,

        /// Report the worst-case margin achieved by this many labeled images
        #[arg(long)]
        current_images: Option<u64>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory containing parquet files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Also search subdirectories
    #[arg(long)]
    recursive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Read before the subscriber exists; a bad file is reported after init
    let config_result = TomlConfig::try_load_for_module(MODULE_NAME);
    let config = config_result.as_ref().ok().cloned().flatten();

    // Reports go to stdout, logs to stderr
    let default_level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = &config_result {
        warn!("Ignoring config file: {}", e);
    }

    info!(
        "docmeta-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match cli.command {
        Command::Load {
            ref source,
            strict,
            batch_size,
        } => {
            let data_dir = resolve_data_dir(source, config.as_ref());
            let pool = open_database(&cli, true).await?;

            let mode = if strict { ReplaceMode::Strict } else { ReplaceMode::Replace };
            let loader = MetadataLoader::new(pool.clone())
                .with_scanner(ParquetScanner::new().recursive(source.recursive))
                .with_reader(ParquetImageReader::new().with_batch_size(batch_size))
                .with_mode(mode);

            let summary = loader
                .load_directory(&data_dir)
                .await
                .with_context(|| format!("Failed to load {}", data_dir.display()))?;

            println!("Files found:   {}", summary.files_found);
            println!("Files loaded:  {}", summary.files_loaded);
            println!("Records:       {}", summary.records_loaded);
            println!("Elapsed:       {:.2}s", summary.elapsed.as_secs_f64());
            println!("Rate:          {:.0} records/s", summary.records_per_second());
            for failure in &summary.failures {
                println!("FAILED {}: {}", failure.path.display(), failure.error);
            }

            if summary.files_loaded > 0 {
                println!();
                print!("{}", DatabaseReport::collect(&pool).await?);
            }
            pool.close().await;

            if !summary.is_clean() {
                bail!("{} file(s) failed to load", summary.failures.len());
            }
        }

        Command::Check { ref source, json } => {
            let data_dir = resolve_data_dir(source, config.as_ref());
            let scanner = ParquetScanner::new().recursive(source.recursive);
            let report = tokio::task::spawn_blocking(move || {
                inspect_directory(&data_dir, &scanner, &ParquetImageReader::new())
            })
            .await?
            .context("Failed to inspect parquet files")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }

        Command::Stats { json } => {
            let pool = open_database(&cli, false).await?;
            let report = DatabaseReport::collect(&pool).await?;
            pool.close().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }

        Command::Query {
            label,
            ref file,
            min_size,
            max_size,
            limit,
            json,
        } => {
            let pool = open_database(&cli, false).await?;
            let records = if let Some(label) = label {
                db::metadata::find_by_label(&pool, label).await?
            } else if let Some(file) = file {
                db::metadata::find_by_parquet_file(&pool, file).await?
            } else {
                db::metadata::find_by_size_range(&pool, SizeRange::new(min_size, max_size)).await?
            };
            pool.close().await;

            print_records(&records, limit, json)?;
        }

        Command::Estimate {
            ref class_boxes,
            confidence,
            margin,
            base_rate,
            current_images,
            json,
        } => {
            let estimator = SampleSizeEstimator {
                classes: estimate::parse_class_boxes(class_boxes)?,
                confidence,
                margin,
                base_rate,
                current_images,
            };
            let estimate = estimator.estimate()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&estimate)?);
            } else {
                print!("{}", estimate);
            }
        }
    }

    Ok(())
}

/// --data-dir > config file `data_dir` > compiled default
fn resolve_data_dir(source: &SourceArgs, config: Option<&TomlConfig>) -> PathBuf {
    source
        .data_dir
        .clone()
        .or_else(|| config.and_then(|c| c.data_dir.clone()))
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().data_dir)
}

async fn open_database(cli: &Cli, create: bool) -> Result<SqlitePool> {
    let db_path = match &cli.database {
        Some(path) => path.clone(),
        None => {
            let root_folder = RootFolderResolver::new(MODULE_NAME)
                .with_cli_arg(cli.root_folder.clone())
                .resolve();
            let initializer = RootFolderInitializer::new(root_folder);
            if create {
                initializer
                    .ensure_directory_exists()
                    .context("Failed to initialize root folder")?;
            }
            initializer.database_path()
        }
    };

    if !create && !db_path.is_file() {
        bail!("Database not found: {} (run `docmeta-ingest load` first)", db_path.display());
    }

    info!("Database: {}", db_path.display());
    let pool = db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(pool)
}

fn print_records(records: &[DocumentMetadata], limit: usize, json: bool) -> Result<()> {
    let shown = &records[..records.len().min(limit)];

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    println!("{} matching records", records.len());
    for r in shown {
        println!(
            "  {} row {:>6}  label {:>3}  {:>10}  {}  {}",
            r.parquet_file,
            r.row_index,
            r.label,
            r.image_size_bytes
                .map(|s| format!("{} B", s))
                .unwrap_or_else(|| "-".to_string()),
            time::to_rfc3339(&r.created_at),
            r.image_path.as_deref().unwrap_or("")
        );
    }
    if records.len() > shown.len() {
        warn!("Showing {} of {} records (raise --limit)", shown.len(), records.len());
    }
    Ok(())
}
