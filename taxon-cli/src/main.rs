use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use taxon_core::catalog::Catalog;
use taxon_core::config::{Config, SplitOptions, DEFAULT_CATALOG_FILE, DEFAULT_SCHEMA_FILE};
use taxon_core::validation::{BatchReport, DocumentReport, Validator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taxon-cli")]
#[command(about = "Split and validate measurand taxonomy catalogs")]
struct Cli {
    /// Print entry structures and serialized documents.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one document per taxon into a directory.
    Split {
        #[arg(short, long, default_value = DEFAULT_CATALOG_FILE)]
        filename: PathBuf,
        /// Output directory; a temporary directory is created when omitted.
        #[arg(short, long)]
        dirpath: Option<PathBuf>,
    },
    /// Validate one document, or every document named in a list file.
    Validate {
        #[arg(short, long, default_value = DEFAULT_CATALOG_FILE)]
        filename: PathBuf,
        /// Directory the file name and list entries are resolved against.
        #[arg(short, long, default_value = ".")]
        dirpath: PathBuf,
        #[arg(short, long, default_value = DEFAULT_SCHEMA_FILE)]
        schema: PathBuf,
        /// Newline-delimited list of file names to validate.
        #[arg(short, long)]
        list: Option<PathBuf>,
    },
    /// Show each taxon with the file it splits into.
    List {
        #[arg(short, long, default_value = DEFAULT_CATALOG_FILE)]
        filename: PathBuf,
        /// Print taxon summaries as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Split { filename, dirpath } => {
            let config = Config::default().with_catalog_path(filename);
            let options = SplitOptions::new(dirpath, cli.verbose);
            let outcome = taxon_core::split::split(&config, &options)
                .with_context(|| format!("failed to split {}", config.catalog_path().display()))?;
            println!("{}", outcome.output_dir.display());
        }
        Commands::Validate {
            filename,
            dirpath,
            schema,
            list,
        } => {
            let mut validator = Validator::from_schema_file(&schema)
                .with_context(|| format!("failed to load schema {}", schema.display()))?;
            let batch = match list {
                Some(list) => validator.validate_list(&dirpath, &list)?,
                None => {
                    let path = dirpath.join(&filename);
                    tracing::info!(file = %path.display(), "validating file");
                    BatchReport::new(vec![validator.validate(&path)?])
                }
            };
            report(&batch)?;
        }
        Commands::List { filename, json } => {
            let catalog = Catalog::from_file(&filename)
                .with_context(|| format!("failed to read {}", filename.display()))?;
            if json {
                let summaries: Vec<_> = catalog.entries().map(|e| e.summary()).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                let mut seen = std::collections::HashSet::new();
                for (name, file) in taxon_core::split::plan(&catalog)? {
                    let marker = if seen.insert(file.clone()) { "" } else { " (collision)" };
                    println!("{name} -> {file}{marker}");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(batch: &BatchReport) -> Result<()> {
    for DocumentReport { issues, .. } in batch.failed() {
        for issue in issues {
            println!("===================");
            println!("{issue}");
            println!("===================");
        }
    }
    if !batch.is_valid() {
        let failed: Vec<&str> = batch.failed().map(|r| r.file.as_str()).collect();
        bail!(
            "{} of {} document(s) failed schema validation: {}",
            failed.len(),
            batch.len(),
            failed.join(", ")
        );
    }
    println!("valid");
    Ok(())
}
