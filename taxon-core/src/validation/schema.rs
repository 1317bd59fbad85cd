//! Compiled schemas. [`XsdSchema`] checks documents with libxml2; the traits
//! let callers substitute their own schema engine.
use super::{document::SourceDocument, ValidatorError};
use libxml::{
    error::StructuredError,
    parser::{Parser, ParserOptions},
    schemas::{SchemaParserContext, SchemaValidationContext},
};
use std::path::Path;

/// A raw violation as reported by the schema engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub line: Option<usize>,
    pub message: String,
}

/// A compiled schema that can check any number of documents.
pub trait Schema {
    /// Every violation found in `document`; empty means the document conforms.
    fn check(&mut self, document: &SourceDocument) -> Result<Vec<SchemaError>, ValidatorError>;
}

/// Compiles a schema definition file.
pub trait SchemaLoader {
    type Schema: Schema;

    fn load(&self, path: &Path) -> Result<Self::Schema, ValidatorError>;
}

/// Loads W3C XML Schema definitions through libxml2.
#[derive(Debug, Clone, Copy, Default)]
pub struct XsdLoader;

impl SchemaLoader for XsdLoader {
    type Schema = XsdSchema;

    fn load(&self, path: &Path) -> Result<XsdSchema, ValidatorError> {
        XsdSchema::from_file(path)
    }
}

/// An XSD compiled once and reused for every checked document.
pub struct XsdSchema {
    context: SchemaValidationContext,
}

impl std::fmt::Debug for XsdSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XsdSchema").finish_non_exhaustive()
    }
}

impl XsdSchema {
    pub fn from_file(path: &Path) -> Result<Self, ValidatorError> {
        // check if file exists because libxml will just unhelpfully error out otherwise
        if !path.exists() {
            return Err(ValidatorError::SchemaNotFound {
                path: path.to_path_buf(),
            });
        }
        let xsd_path = path.to_str().ok_or_else(|| ValidatorError::SchemaLoad {
            path: path.to_path_buf(),
            messages: vec!["schema path is not valid UTF-8".to_string()],
        })?;

        let mut parser_ctx = SchemaParserContext::from_file(xsd_path);
        let context = SchemaValidationContext::from_parser(&mut parser_ctx).map_err(|errors| {
            ValidatorError::SchemaLoad {
                path: path.to_path_buf(),
                messages: errors.into_iter().map(|e| into_schema_error(e).message).collect(),
            }
        })?;
        Ok(Self { context })
    }
}

impl Schema for XsdSchema {
    fn check(&mut self, document: &SourceDocument) -> Result<Vec<SchemaError>, ValidatorError> {
        // libxml2 recovers from malformed input by default
        let options = ParserOptions {
            recover: false,
            ..Default::default()
        };
        let parsed = Parser::default()
            .parse_string_with_options(document.text(), options)
            .map_err(|e| ValidatorError::Parse {
                file: document.label().to_string(),
                message: format!("{e:?}"),
            })?;
        match self.context.validate_document(&parsed) {
            Ok(()) => {
                // warnings of a conforming document stay queued otherwise
                let _ = self.context.drain_errors();
                Ok(Vec::new())
            }
            Err(errors) => Ok(errors.into_iter().map(into_schema_error).collect()),
        }
    }
}

fn into_schema_error(error: StructuredError) -> SchemaError {
    let message = error
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("libxml2 error code {}", error.code));
    SchemaError {
        line: error
            .line
            .and_then(|line| usize::try_from(line).ok())
            .filter(|line| *line > 0),
        message,
    }
}
