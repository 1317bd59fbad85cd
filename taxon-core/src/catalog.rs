//! Taxonomy catalog model: the root document, its taxon entries, and the
//! per-entry standalone documents derived from them.
pub mod xml;

use crate::config::{NamespaceBinding, NamespaceBindings};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xml::constants::{CATALOG_ROOT, ENTRY_ELEMENT, NAME_ATTRIBUTE};
use xml::{Element, XmlError};

/// Errors raised while loading a catalog or deriving documents from it.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("expected a <{expected}> root element, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },
    #[error("taxon #{index} has no `name` attribute")]
    MissingName { index: usize },
    #[error("taxon name {name:?} cannot be used as a file name")]
    UnsafeName { name: String },
}

/// A parsed taxonomy catalog.
///
/// # Examples
/// ```rust
/// use taxon_core::catalog::Catalog;
///
/// let catalog = Catalog::parse(
///     r#"<mtc:Taxonomy xmlns:mtc="urn:mtc"><mtc:Taxon name="A.B"/></mtc:Taxonomy>"#,
/// )?;
/// assert_eq!(catalog.len(), 1);
/// # Ok::<(), taxon_core::catalog::CatalogError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    root: Element,
    namespaces: Vec<NamespaceBinding>,
}

impl Catalog {
    pub fn parse(xml: &str) -> Result<Self, CatalogError> {
        let root = xml::parse_document(xml)?;
        if root.local_name() != CATALOG_ROOT {
            return Err(CatalogError::UnexpectedRoot {
                expected: CATALOG_ROOT,
                found: root.name().to_string(),
            });
        }
        let namespaces = root
            .attributes()
            .iter()
            .filter_map(|(key, uri)| {
                let prefix = match key.as_str() {
                    "xmlns" => "",
                    other => other.strip_prefix("xmlns:")?,
                };
                Some(NamespaceBinding::new(prefix, uri.as_str()))
            })
            .collect();
        Ok(Self { root, namespaces })
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let xml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&xml)
    }

    /// Qualified name of the root element.
    pub fn root_name(&self) -> &str {
        self.root.name()
    }

    /// Namespace declarations found on the catalog root.
    pub fn namespaces(&self) -> &[NamespaceBinding] {
        &self.namespaces
    }

    /// Taxon entries in document order.
    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> {
        self.root
            .child_elements()
            .filter(|e| e.local_name() == ENTRY_ELEMENT)
            .enumerate()
            .map(|(index, element)| Entry { index, element })
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// One taxon inside a [`Catalog`].
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    index: usize,
    element: &'a Element,
}

impl<'a> Entry<'a> {
    /// Zero-based position among the catalog's entries.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn name(&self) -> Result<&'a str, CatalogError> {
        match self.element.attribute(NAME_ATTRIBUTE) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(CatalogError::MissingName { index: self.index }),
        }
    }

    pub fn file_name(&self) -> Result<String, CatalogError> {
        derive_file_name(self.name()?)
    }

    /// Build a standalone document rooted at a copy of this entry, declaring
    /// `namespaces` on it.
    pub fn to_document(&self, namespaces: &NamespaceBindings) -> Element {
        let mut document = self.element.clone();
        for binding in namespaces.iter() {
            document.set_attribute(binding.attribute_name(), binding.uri.as_str());
        }
        document
    }

    pub fn summary(&self) -> TaxonSummary {
        TaxonSummary::from_element(self.element)
    }
}

/// Map a taxon name to its output file name: every `.` becomes `_` and
/// `.xml` is appended.
///
/// Distinct names can map to the same file (`A.1` and `A_1` both give
/// `A_1.xml`); callers writing into one directory see the later one win.
pub fn derive_file_name(name: &str) -> Result<String, CatalogError> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(CatalogError::UnsafeName {
            name: name.to_string(),
        });
    }
    Ok(format!("{}.xml", name.replace('.', "_")))
}

/// Read-only typed view of a taxon for listings and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxonSummary {
    pub name: String,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_quantity: Option<String>,
    pub parameters: Vec<ParameterSummary>,
    pub disciplines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
}

impl TaxonSummary {
    fn from_element(element: &Element) -> Self {
        let quantity_of = |e: &Element| {
            e.child("Quantity")
                .and_then(|q| q.attribute("name"))
                .map(str::to_string)
        };
        Self {
            name: element.attribute(NAME_ATTRIBUTE).unwrap_or_default().to_string(),
            deprecated: element.attribute("deprecated") == Some("true"),
            replacement: element
                .attribute("replacement")
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            result_quantity: element.child("Result").and_then(quantity_of),
            parameters: element
                .child_elements()
                .filter(|e| e.local_name() == "Parameter")
                .map(|p| ParameterSummary {
                    name: p.attribute("name").unwrap_or_default().to_string(),
                    optional: p.attribute("optional") == Some("true"),
                    quantity: quantity_of(p),
                })
                .collect(),
            disciplines: element
                .child_elements()
                .filter(|e| e.local_name() == "Discipline")
                .filter_map(|d| d.attribute("name").map(str::to_string).or_else(|| d.text()))
                .collect(),
            definition: element.child("Definition").and_then(Element::text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::xml::constants::{TAXONOMY_NS, UOM_NS};

    const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mtc:Taxonomy xmlns:mtc="urn:old-mtc" xmlns:uom="urn:old-uom">
  <mtc:Taxon name="Measure.Temperature.Simulated" deprecated="false">
    <mtc:Result name="temperature">
      <uom:Quantity name="temperature"/>
    </mtc:Result>
    <mtc:Parameter name="Temperature" optional="false">
      <mtc:Definition>The temperature to simulate.</mtc:Definition>
      <uom:Quantity name="temperature"/>
    </mtc:Parameter>
    <mtc:Parameter name="Offset" optional="true"/>
    <mtc:Discipline name="Thermodynamics"/>
    <mtc:Definition>Simulates a temperature.</mtc:Definition>
  </mtc:Taxon>
  <!-- trailing -->
  <mtc:Taxon name="Source.Voltage"/>
</mtc:Taxonomy>"#;

    #[test]
    fn parses_entries_in_order() {
        let catalog = Catalog::parse(CATALOG).expect("parse");
        let names: Vec<&str> = catalog
            .entries()
            .map(|e| e.name().expect("name"))
            .collect();
        assert_eq!(names, vec!["Measure.Temperature.Simulated", "Source.Voltage"]);
        assert_eq!(catalog.root_name(), "mtc:Taxonomy");
        assert_eq!(catalog.namespaces().len(), 2);
        assert_eq!(catalog.namespaces()[0], NamespaceBinding::new("mtc", "urn:old-mtc"));
    }

    #[test]
    fn rejects_foreign_root() {
        let err = Catalog::parse("<Invoice/>").unwrap_err();
        assert!(matches!(err, CatalogError::UnexpectedRoot { ref found, .. } if found == "Invoice"));
    }

    #[test]
    fn empty_catalog_has_no_entries() {
        let catalog = Catalog::parse("<mtc:Taxonomy xmlns:mtc=\"urn:x\"/>").expect("parse");
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
    }

    #[test]
    fn missing_or_empty_name_is_an_error() {
        let catalog = Catalog::parse(
            r#"<Taxonomy><Taxon name="ok"/><Taxon/><Taxon name=""/></Taxonomy>"#,
        )
        .expect("parse");
        let errors: Vec<usize> = catalog
            .entries()
            .filter_map(|e| match e.name() {
                Err(CatalogError::MissingName { index }) => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec![1, 2]);
    }

    #[test]
    fn file_name_replaces_every_dot() {
        assert_eq!(derive_file_name("A.1.2").unwrap(), "A_1_2.xml");
        assert_eq!(derive_file_name("temp").unwrap(), "temp.xml");
        assert_eq!(
            derive_file_name("A.1").unwrap(),
            derive_file_name("A_1").unwrap()
        );
    }

    #[test]
    fn file_name_rejects_path_separators() {
        assert!(matches!(
            derive_file_name("../etc/passwd"),
            Err(CatalogError::UnsafeName { .. })
        ));
        assert!(matches!(
            derive_file_name("a\\b"),
            Err(CatalogError::UnsafeName { .. })
        ));
    }

    #[test]
    fn document_carries_fixed_namespaces_after_existing_attributes() {
        let catalog = Catalog::parse(CATALOG).expect("parse");
        let entry = catalog.entries().nth(1).expect("entry");
        let document = entry.to_document(&NamespaceBindings::default());
        assert_eq!(
            document.attributes(),
            &[
                ("name".to_string(), "Source.Voltage".to_string()),
                ("xmlns:mtc".to_string(), TAXONOMY_NS.to_string()),
                ("xmlns:uom".to_string(), UOM_NS.to_string()),
            ]
        );
        // the catalog tree is untouched
        assert_eq!(entry.element().attributes().len(), 1);
    }

    #[test]
    fn document_overrides_entry_level_declarations() {
        let catalog = Catalog::parse(
            r#"<mtc:Taxonomy><mtc:Taxon xmlns:mtc="urn:stale" name="X"/></mtc:Taxonomy>"#,
        )
        .expect("parse");
        let entry = catalog.entries().next().expect("entry");
        let document = entry.to_document(&NamespaceBindings::default());
        assert_eq!(document.attribute("xmlns:mtc"), Some(TAXONOMY_NS));
        assert_eq!(document.attributes().len(), 3);
    }

    #[test]
    fn summary_reads_taxon_fields() {
        let catalog = Catalog::parse(CATALOG).expect("parse");
        let summary = catalog.entries().next().expect("entry").summary();
        assert_eq!(summary.name, "Measure.Temperature.Simulated");
        assert!(!summary.deprecated);
        assert_eq!(summary.result_quantity.as_deref(), Some("temperature"));
        assert_eq!(summary.parameters.len(), 2);
        assert_eq!(summary.parameters[0].quantity.as_deref(), Some("temperature"));
        assert!(summary.parameters[1].optional);
        assert_eq!(summary.disciplines, vec!["Thermodynamics".to_string()]);
        assert_eq!(summary.definition.as_deref(), Some("Simulates a temperature."));
    }
}
