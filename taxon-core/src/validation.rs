//! Schema validation of taxon documents, one at a time or from a list file.
//!
//! A [`Validator`] owns one compiled schema and checks every document of a
//! run against it. Well-formedness is checked before schema conformance, so a
//! malformed document surfaces as [`ValidatorError::Parse`] rather than as
//! issues. Schema violations never stop a run: every violation of a document
//! is collected into its [`DocumentReport`], and a batch goes on to the next
//! listed file.
pub mod document;
pub mod schema;

use document::SourceDocument;
use schema::{Schema, SchemaError, SchemaLoader, XsdLoader, XsdSchema};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Failures that end a validation run.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("schema file not found: {path}")]
    SchemaNotFound { path: PathBuf },
    #[error("failed to compile schema {path}: {}", .messages.join("; "))]
    SchemaLoad { path: PathBuf, messages: Vec<String> },
    #[error("document not found: {path}")]
    DocumentNotFound { path: PathBuf },
    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One schema violation located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub file: String,
    pub line: Option<usize>,
    /// Instance path of the offending element.
    pub path: String,
    /// The message without its element/attribute locator.
    pub reason: String,
    pub message: String,
}

impl ValidationIssue {
    fn locate(file: &str, document: &SourceDocument, error: SchemaError) -> Self {
        let hint = element_hint(&error.message);
        Self {
            file: file.to_string(),
            line: error.line,
            path: document.path_index().resolve(error.line, hint),
            reason: reason(&error.message).to_string(),
            message: error.message,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file: {}; sourceline: ", self.file)?;
        match self.line {
            Some(line) => write!(f, "{line}")?,
            None => f.write_str("?")?,
        }
        write!(
            f,
            "; path: {} | reason: {} | message: {}",
            self.path, self.reason, self.message
        )
    }
}

// libxml2 prefixes messages with "Element '{ns}local'[, attribute 'a']: "
const LOCATOR_PREFIX: &str = "Element '";

fn element_hint(message: &str) -> Option<&str> {
    let rest = message.strip_prefix(LOCATOR_PREFIX)?;
    let qname = &rest[..rest.find('\'')?];
    let name = qname.rsplit_once('}').map_or(qname, |(_, local)| local);
    Some(crate::catalog::xml::local_name(name))
}

fn reason(message: &str) -> &str {
    if message.starts_with(LOCATOR_PREFIX) {
        if let Some(at) = message.find("': ") {
            return message[at + 3..].trim();
        }
    }
    message.trim()
}

/// All issues found in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub file: String,
    pub issues: Vec<ValidationIssue>,
}

impl DocumentReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Per-file reports of a batch, in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    reports: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn new(reports: Vec<DocumentReport>) -> Self {
        Self { reports }
    }

    pub fn reports(&self) -> &[DocumentReport] {
        &self.reports
    }

    pub fn get(&self, file: &str) -> Option<&DocumentReport> {
        self.reports.iter().find(|r| r.file == file)
    }

    /// True when every document conforms; an empty batch is valid.
    pub fn is_valid(&self) -> bool {
        self.reports.iter().all(DocumentReport::is_valid)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.reports.iter().filter(|r| !r.is_valid())
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.reports.iter().flat_map(|r| r.issues.iter())
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// Checks documents against one compiled schema.
///
/// # Examples
/// ```rust,no_run
/// use std::path::Path;
/// use taxon_core::validation::Validator;
///
/// let mut validator = Validator::from_schema_file(Path::new("MeasurandTaxonomyCatalog.xsd"))?;
/// let report = validator.validate(Path::new("Measure_Temperature.xml"))?;
/// for issue in &report.issues {
///     println!("{issue}");
/// }
/// # Ok::<(), taxon_core::validation::ValidatorError>(())
/// ```
#[derive(Debug)]
pub struct Validator<S> {
    schema: S,
}

impl Validator<XsdSchema> {
    pub fn from_schema_file(path: &Path) -> Result<Self, ValidatorError> {
        Self::load(&XsdLoader, path)
    }
}

impl<S: Schema> Validator<S> {
    pub fn new(schema: S) -> Self {
        Self { schema }
    }

    /// Compile the schema at `path` once with `loader`.
    pub fn load<L>(loader: &L, path: &Path) -> Result<Self, ValidatorError>
    where
        L: SchemaLoader<Schema = S>,
    {
        info!(schema = %path.display(), "compiling schema");
        Ok(Self::new(loader.load(path)?))
    }

    /// Validate the document at `path`, labelling issues with the path as given.
    pub fn validate(&mut self, path: &Path) -> Result<DocumentReport, ValidatorError> {
        self.validate_labelled(path, &path.display().to_string())
    }

    pub fn validate_document(
        &mut self,
        document: &SourceDocument,
    ) -> Result<DocumentReport, ValidatorError> {
        let file = document.label().to_string();
        let issues: Vec<ValidationIssue> = self
            .schema
            .check(document)?
            .into_iter()
            .map(|error| ValidationIssue::locate(&file, document, error))
            .collect();
        if issues.is_empty() {
            info!(file = %file, "document is valid");
        } else {
            warn!(file = %file, issues = issues.len(), "document failed schema validation");
        }
        Ok(DocumentReport { file, issues })
    }

    /// Validate each name resolved against `base_dir`. Reports are labelled
    /// with the names as listed.
    pub fn validate_files<I, N>(
        &mut self,
        base_dir: &Path,
        names: I,
    ) -> Result<BatchReport, ValidatorError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut reports = Vec::new();
        for name in names {
            let name = name.as_ref();
            let path = base_dir.join(name);
            info!(file = %path.display(), "validating file from list");
            reports.push(self.validate_labelled(&path, name)?);
        }
        Ok(BatchReport::new(reports))
    }

    /// Validate every file named in the newline-delimited `list_file`.
    pub fn validate_list(
        &mut self,
        base_dir: &Path,
        list_file: &Path,
    ) -> Result<BatchReport, ValidatorError> {
        let names = read_list(list_file)?;
        self.validate_files(base_dir, &names)
    }

    fn validate_labelled(
        &mut self,
        path: &Path,
        label: &str,
    ) -> Result<DocumentReport, ValidatorError> {
        let document = SourceDocument::from_file(path, label)?;
        self.validate_document(&document)
    }
}

/// Read a list file: one relative file name per line, blank lines ignored.
pub fn read_list(list_file: &Path) -> Result<Vec<String>, ValidatorError> {
    let text = std::fs::read_to_string(list_file).map_err(|source| ValidatorError::Io {
        path: list_file.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Validate a single document against the XSD at `schema_path`.
pub fn validate(schema_path: &Path, document_path: &Path) -> Result<DocumentReport, ValidatorError> {
    Validator::from_schema_file(schema_path)?.validate(document_path)
}

/// Validate every file named in `list_file`, resolved against `base_dir`,
/// compiling the XSD at `schema_path` once.
pub fn validate_list(
    schema_path: &Path,
    base_dir: &Path,
    list_file: &Path,
) -> Result<BatchReport, ValidatorError> {
    validate_list_with(&XsdLoader, schema_path, base_dir, list_file)
}

/// [`validate_list`] with a caller-supplied schema loader.
pub fn validate_list_with<L: SchemaLoader>(
    loader: &L,
    schema_path: &Path,
    base_dir: &Path,
    list_file: &Path,
) -> Result<BatchReport, ValidatorError> {
    Validator::load(loader, schema_path)?.validate_list(base_dir, list_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRIBUTE_MESSAGE: &str = "Element '{urn:mtc}Parameter', attribute 'optional': \
        'maybe' is not a valid value of the atomic type 'xs:boolean'.";

    #[test]
    fn reason_strips_element_and_attribute_locator() {
        assert_eq!(
            reason(ATTRIBUTE_MESSAGE),
            "'maybe' is not a valid value of the atomic type 'xs:boolean'."
        );
        assert_eq!(
            reason("Element 'Taxon': This element is not expected."),
            "This element is not expected."
        );
        assert_eq!(reason("  something else \n"), "something else");
    }

    #[test]
    fn element_hint_reads_local_name() {
        assert_eq!(element_hint(ATTRIBUTE_MESSAGE), Some("Parameter"));
        assert_eq!(element_hint("Element 'mtc:Taxon': x"), Some("Taxon"));
        assert_eq!(element_hint("no locator"), None);
    }

    #[test]
    fn issue_display_matches_report_format() {
        let issue = ValidationIssue {
            file: "A_B.xml".into(),
            line: Some(3),
            path: "/mtc:Taxon/mtc:Parameter[1]".into(),
            reason: "bad".into(),
            message: "Element 'x': bad".into(),
        };
        assert_eq!(
            issue.to_string(),
            "file: A_B.xml; sourceline: 3; path: /mtc:Taxon/mtc:Parameter[1] | reason: bad | message: Element 'x': bad"
        );
    }

    #[test]
    fn batch_validity_is_conjunction() {
        let ok = DocumentReport {
            file: "a.xml".into(),
            issues: vec![],
        };
        let bad = DocumentReport {
            file: "b.xml".into(),
            issues: vec![ValidationIssue {
                file: "b.xml".into(),
                line: None,
                path: "/".into(),
                reason: "r".into(),
                message: "m".into(),
            }],
        };
        assert!(BatchReport::default().is_valid());
        assert!(BatchReport::new(vec![ok.clone()]).is_valid());
        let batch = BatchReport::new(vec![ok, bad]);
        assert!(!batch.is_valid());
        assert_eq!(batch.failed().count(), 1);
        assert_eq!(batch.get("b.xml").map(|r| r.issues.len()), Some(1));
        assert_eq!(batch.issues().count(), 1);
    }

    #[test]
    fn read_list_skips_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let list = dir.path().join("files.txt");
        std::fs::write(&list, "a.xml\r\n\n  b.xml  \n").expect("write list");
        assert_eq!(read_list(&list).expect("list"), vec!["a.xml", "b.xml"]);
    }
}
