//! Configuration for the splitter and validator.
use std::path::{Path, PathBuf};

use crate::catalog::xml::constants::{TAXONOMY_NS, TAXONOMY_PREFIX, UOM_NS, UOM_PREFIX};

pub const DEFAULT_CATALOG_FILE: &str = "MeasurandTaxonomyCatalog.xml";
pub const DEFAULT_SCHEMA_FILE: &str = "MeasurandTaxonomyCatalog.xsd";

/// A namespace prefix bound to its canonical URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    pub prefix: String,
    pub uri: String,
}

impl NamespaceBinding {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    /// Attribute name used to declare this binding, e.g. `xmlns:mtc`.
    pub fn attribute_name(&self) -> String {
        if self.prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", self.prefix)
        }
    }
}

/// The namespace declarations stamped onto every split document.
///
/// The default set is the taxonomy namespace followed by the unit-of-measure
/// namespace, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBindings(Vec<NamespaceBinding>);

impl NamespaceBindings {
    pub fn new(bindings: Vec<NamespaceBinding>) -> Self {
        Self(bindings)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceBinding> {
        self.0.iter()
    }
}

impl Default for NamespaceBindings {
    fn default() -> Self {
        Self(vec![
            NamespaceBinding::new(TAXONOMY_PREFIX, TAXONOMY_NS),
            NamespaceBinding::new(UOM_PREFIX, UOM_NS),
        ])
    }
}

/// Paths and namespace settings shared by the splitter and the validator.
///
/// # Examples
/// ```rust
/// use taxon_core::config::Config;
///
/// let config = Config::new("catalog.xml", "schema/MeasurandTaxonomyCatalog.xsd");
/// assert_eq!(config.catalog_path().to_str(), Some("catalog.xml"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    catalog_path: PathBuf,
    schema_path: PathBuf,
    namespaces: NamespaceBindings,
}

impl Config {
    pub fn new(catalog_path: impl Into<PathBuf>, schema_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            schema_path: schema_path.into(),
            namespaces: NamespaceBindings::default(),
        }
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    pub fn with_schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = path.into();
        self
    }

    pub fn with_namespaces(mut self, namespaces: NamespaceBindings) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    pub fn namespaces(&self) -> &NamespaceBindings {
        &self.namespaces
    }
}

// conventional names in the working directory
impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_CATALOG_FILE, DEFAULT_SCHEMA_FILE)
    }
}

/// Per-run options for [`crate::split::split`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOptions {
    /// Target directory. `None` allocates a fresh temporary directory that
    /// outlives the run.
    pub output_dir: Option<PathBuf>,
    /// Dump each entry's structure and serialized form before writing it.
    pub verbose: bool,
}

impl SplitOptions {
    pub fn new(output_dir: Option<PathBuf>, verbose: bool) -> Self {
        Self {
            output_dir,
            verbose,
        }
    }
}
