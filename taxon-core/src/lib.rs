//! Split measurand taxonomy catalogs into per-taxon documents and validate
//! documents against the catalog schema.
//!
//! # Examples
//! ```rust,no_run
//! use std::path::Path;
//! use taxon_core::config::{Config, SplitOptions};
//!
//! let config = Config::default();
//! let outcome = taxon_core::split::split(&config, &SplitOptions::default())?;
//! let report = taxon_core::validation::validate(
//!     config.schema_path(),
//!     &outcome.written[0].path,
//! )?;
//! assert!(report.is_valid());
//! # Ok::<(), taxon_core::Error>(())
//! ```
pub mod catalog;
pub mod config;
pub mod split;
pub mod validation;

use thiserror::Error;

pub use catalog::xml::constants::{TAXONOMY_NS, TAXONOMY_PREFIX, UOM_NS, UOM_PREFIX};
pub use catalog::{Catalog, CatalogError, Entry};
pub use config::{Config, NamespaceBinding, NamespaceBindings, SplitOptions};
pub use split::{SplitError, SplitOutcome};
pub use validation::{BatchReport, DocumentReport, ValidationIssue, Validator, ValidatorError};

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),
    #[error(transparent)]
    Xml(#[from] catalog::xml::XmlError),
    #[error(transparent)]
    Split(#[from] split::SplitError),
    #[error(transparent)]
    Validation(#[from] validation::ValidatorError),
}
