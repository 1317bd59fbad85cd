use std::path::{Path, PathBuf};

use taxon_core::validation::document::SourceDocument;
use taxon_core::validation::schema::{Schema, SchemaError, SchemaLoader};
use taxon_core::validation::ValidatorError;

#[allow(dead_code)]
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[allow(dead_code)]
pub fn catalog_fixture() -> PathBuf {
    fixture("MeasurandTaxonomyCatalog.xml")
}

#[allow(dead_code)]
pub fn schema_fixture() -> PathBuf {
    fixture("MeasurandTaxonomyCatalog.xsd")
}

/// Loader that counts how many schemas it compiled.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingLoader {
    pub loads: std::cell::Cell<usize>,
}

impl SchemaLoader for CountingLoader {
    type Schema = MarkerSchema;

    fn load(&self, _path: &Path) -> Result<MarkerSchema, ValidatorError> {
        self.loads.set(self.loads.get() + 1);
        Ok(MarkerSchema)
    }
}

/// Flags every line containing `INVALID`.
#[allow(dead_code)]
pub struct MarkerSchema;

impl Schema for MarkerSchema {
    fn check(&mut self, document: &SourceDocument) -> Result<Vec<SchemaError>, ValidatorError> {
        Ok(document
            .text()
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains("INVALID"))
            .map(|(i, _)| SchemaError {
                line: Some(i + 1),
                message: "Element 'Taxon': marked INVALID.".to_string(),
            })
            .collect())
    }
}

#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}
