//! Split a taxonomy catalog into one standalone document per taxon.
use crate::catalog::{xml, Catalog, CatalogError};
use crate::config::{Config, SplitOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const TEMP_DIR_PREFIX: &str = "taxonomy-";

/// Errors emitted while splitting a catalog.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to serialize taxon {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: xml::XmlError,
    },
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One document written by [`split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDocument {
    pub name: String,
    pub path: PathBuf,
}

/// Result of a split run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub output_dir: PathBuf,
    /// One record per catalog entry, in catalog order.
    pub written: Vec<WrittenDocument>,
}

impl SplitOutcome {
    /// Entries whose file was overwritten by a later entry of the same run,
    /// paired with the name of the entry that replaced it.
    pub fn collisions(&self) -> Vec<(&str, &str)> {
        let mut last_writer: HashMap<&Path, &str> = HashMap::new();
        let mut collisions = Vec::new();
        for doc in &self.written {
            if let Some(previous) = last_writer.insert(doc.path.as_path(), doc.name.as_str()) {
                collisions.push((previous, doc.name.as_str()));
            }
        }
        collisions
    }
}

/// Entry names paired with the file names they would be written to.
pub fn plan(catalog: &Catalog) -> Result<Vec<(String, String)>, CatalogError> {
    catalog
        .entries()
        .map(|entry| -> Result<(String, String), CatalogError> {
            Ok((entry.name()?.to_string(), entry.file_name()?))
        })
        .collect()
}

/// Split the catalog named by `config` into `options.output_dir`.
///
/// Each entry is written to `<output_dir>/<name with '.' replaced by '_'>.xml`,
/// replacing any existing file. The first failing entry aborts the run;
/// documents already written stay on disk.
///
/// # Examples
/// ```rust,no_run
/// use taxon_core::config::{Config, SplitOptions};
/// use taxon_core::split::split;
///
/// let outcome = split(&Config::default(), &SplitOptions::default())?;
/// println!("{}", outcome.output_dir.display());
/// # Ok::<(), taxon_core::split::SplitError>(())
/// ```
pub fn split(config: &Config, options: &SplitOptions) -> Result<SplitOutcome, SplitError> {
    info!(catalog = %config.catalog_path().display(), "splitting taxonomy catalog");
    let catalog = Catalog::from_file(config.catalog_path())?;
    let output_dir = prepare_output_dir(options.output_dir.as_deref())?;
    info!(output_dir = %output_dir.display(), "writing taxon documents");
    split_catalog(&catalog, config, &output_dir, options.verbose)
}

/// Write every entry of an already parsed catalog into `output_dir`.
pub fn split_catalog(
    catalog: &Catalog,
    config: &Config,
    output_dir: &Path,
    verbose: bool,
) -> Result<SplitOutcome, SplitError> {
    let mut written: Vec<WrittenDocument> = Vec::new();
    let mut owners: HashMap<String, String> = HashMap::new();

    for entry in catalog.entries() {
        let name = entry.name()?;
        let file_name = entry.file_name()?;
        let path = output_dir.join(&file_name);

        let document = entry.to_document(config.namespaces());
        let serialized = xml::to_document_string(&document).map_err(|source| {
            SplitError::Serialize {
                name: name.to_string(),
                source,
            }
        })?;

        if verbose {
            info!(name, path = %path.display(), "writing taxon");
            info!("{:#?}", entry.element());
            info!("\n{serialized}");
        } else {
            debug!(name, path = %path.display(), "writing taxon");
        }

        if let Some(previous) = owners.insert(file_name, name.to_string()) {
            warn!(
                previous = %previous,
                current = name,
                path = %path.display(),
                "taxon file name collision, overwriting"
            );
        }

        std::fs::write(&path, serialized.as_bytes()).map_err(|source| SplitError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(WrittenDocument {
            name: name.to_string(),
            path,
        });
    }

    info!(count = written.len(), "catalog split complete");
    Ok(SplitOutcome {
        output_dir: output_dir.to_path_buf(),
        written,
    })
}

fn prepare_output_dir(requested: Option<&Path>) -> Result<PathBuf, SplitError> {
    match requested {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| SplitError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
            Ok(dir.to_path_buf())
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix(TEMP_DIR_PREFIX)
                .tempdir()
                .map_err(|source| SplitError::OutputDir {
                    path: std::env::temp_dir(),
                    source,
                })?;
            Ok(dir.keep())
        }
    }
}
