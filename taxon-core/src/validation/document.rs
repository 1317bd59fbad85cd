//! Candidate documents and the line-to-path index used to locate schema
//! violations inside them.
use super::ValidatorError;
use quick_xml::{events::Event, Reader};
use std::collections::HashMap;
use std::path::Path;

/// A well-formed document ready for schema checking.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    label: String,
    text: String,
    index: PathIndex,
}

impl SourceDocument {
    /// Check well-formedness of `text` and index its elements.
    pub fn parse(label: impl Into<String>, text: impl Into<String>) -> Result<Self, ValidatorError> {
        let label = label.into();
        let text = text.into();
        let index = PathIndex::build(&text).map_err(|message| ValidatorError::Parse {
            file: label.clone(),
            message,
        })?;
        Ok(Self { label, text, index })
    }

    pub fn from_file(path: &Path, label: impl Into<String>) -> Result<Self, ValidatorError> {
        // libxml only reports a generic I/O failure for missing files
        if !path.exists() {
            return Err(ValidatorError::DocumentNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ValidatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(label, text)
    }

    /// Name used in reports, usually the path as given by the caller.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path_index(&self) -> &PathIndex {
        &self.index
    }
}

/// An element start tag located in its source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedElement {
    /// 1-based line on which the start tag ends.
    pub line: usize,
    /// Instance path, e.g. `/mtc:Taxon/mtc:Parameter[2]`.
    pub path: String,
    pub local_name: String,
}

/// Element paths keyed by source line, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    elements: Vec<IndexedElement>,
}

struct Frame {
    path: String,
    seen: HashMap<String, usize>,
}

impl PathIndex {
    /// Walk `xml` once, recording every element. Fails with a message that
    /// carries the line of the first well-formedness error.
    pub fn build(xml: &str) -> Result<Self, String> {
        let bytes = xml.as_bytes();
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Frame> = Vec::new();
        let mut roots = 0usize;
        let mut elements = Vec::new();
        let mut line = 1usize;
        let mut counted = 0usize;

        loop {
            let event = reader.read_event();
            let position = (reader.buffer_position() as usize).min(bytes.len());
            line += bytes[counted..position].iter().filter(|b| **b == b'\n').count();
            counted = position;

            let event = event.map_err(|e| format!("line {line}: {e}"))?;
            let (start, is_empty) = match event {
                Event::Start(start) => (start, false),
                Event::Empty(start) => (start, true),
                Event::End(_) => {
                    if stack.pop().is_none() {
                        return Err(format!("line {line}: closing tag without opening tag"));
                    }
                    continue;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|e| format!("line {line}: {e}"))?;
                    if stack.is_empty() && !value.trim().is_empty() {
                        return Err(format!("line {line}: text outside the root element"));
                    }
                    continue;
                }
                Event::CData(_) if stack.is_empty() => {
                    return Err(format!("line {line}: CDATA outside the root element"));
                }
                Event::Eof => break,
                _ => continue,
            };

            for attr in start.attributes() {
                let attr = attr.map_err(|e| format!("line {line}: {e}"))?;
                attr.unescape_value()
                    .map_err(|e| format!("line {line}: {e}"))?;
            }
            let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
            let path = match stack.last_mut() {
                Some(parent) => {
                    let ordinal = parent.seen.entry(name.clone()).or_insert(0);
                    *ordinal += 1;
                    format!("{}/{}[{}]", parent.path, name, ordinal)
                }
                None => {
                    roots += 1;
                    if roots > 1 {
                        return Err(format!("line {line}: more than one root element"));
                    }
                    format!("/{name}")
                }
            };
            elements.push(IndexedElement {
                line,
                path: path.clone(),
                local_name: crate::catalog::xml::local_name(&name).to_string(),
            });
            if !is_empty {
                stack.push(Frame {
                    path,
                    seen: HashMap::new(),
                });
            }
        }

        if let Some(open) = stack.last() {
            return Err(format!("line {line}: element {} is not closed", open.path));
        }
        if roots == 0 {
            return Err("document has no root element".to_string());
        }
        Ok(Self { elements })
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedElement> {
        self.elements.iter()
    }

    /// Instance path for a violation reported at `line`.
    ///
    /// Among elements ending on that line the one whose local name matches
    /// `element_hint` wins, then the first. Without any element on the line
    /// the nearest preceding element is used.
    pub fn resolve(&self, line: Option<usize>, element_hint: Option<&str>) -> String {
        let Some(line) = line else {
            return self.root_path();
        };
        let on_line: Vec<&IndexedElement> =
            self.elements.iter().filter(|e| e.line == line).collect();
        if let Some(hint) = element_hint {
            if let Some(found) = on_line.iter().find(|e| e.local_name == hint) {
                return found.path.clone();
            }
        }
        if let Some(first) = on_line.first() {
            return first.path.clone();
        }
        self.elements
            .iter()
            .rev()
            .find(|e| e.line < line)
            .map(|e| e.path.clone())
            .unwrap_or_else(|| self.root_path())
    }

    fn root_path(&self) -> String {
        self.elements
            .first()
            .map(|e| e.path.clone())
            .unwrap_or_else(|| "/".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<mtc:Taxon name="A">
  <mtc:Parameter name="x"/>
  <mtc:Parameter
      name="y">
    <mtc:Definition>d</mtc:Definition>
  </mtc:Parameter>
  <mtc:Definition>t</mtc:Definition>
</mtc:Taxon>
"#;

    #[test]
    fn indexes_paths_with_sibling_ordinals() {
        let index = PathIndex::build(DOC).expect("index");
        let entries: Vec<(usize, &str)> =
            index.iter().map(|e| (e.line, e.path.as_str())).collect();
        assert_eq!(
            entries,
            vec![
                (2, "/mtc:Taxon"),
                (3, "/mtc:Taxon/mtc:Parameter[1]"),
                (5, "/mtc:Taxon/mtc:Parameter[2]"),
                (6, "/mtc:Taxon/mtc:Parameter[2]/mtc:Definition[1]"),
                (8, "/mtc:Taxon/mtc:Definition[1]"),
            ]
        );
    }

    #[test]
    fn resolve_prefers_hint_then_falls_back_to_preceding_element() {
        let index = PathIndex::build(DOC).expect("index");
        assert_eq!(index.resolve(Some(3), None), "/mtc:Taxon/mtc:Parameter[1]");
        assert_eq!(index.resolve(Some(4), None), "/mtc:Taxon/mtc:Parameter[1]");
        assert_eq!(index.resolve(Some(99), None), "/mtc:Taxon/mtc:Definition[1]");
        assert_eq!(index.resolve(None, None), "/mtc:Taxon");

        let compact = PathIndex::build("<a><b/><c/></a>").expect("index");
        assert_eq!(compact.resolve(Some(1), Some("c")), "/a/c[1]");
        assert_eq!(compact.resolve(Some(1), Some("zzz")), "/a");
    }

    #[test]
    fn malformed_document_reports_line() {
        let err = PathIndex::build("<a>\n<b>\n</a>").unwrap_err();
        assert!(err.starts_with("line 3"), "{err}");
    }

    #[test]
    fn unclosed_and_empty_documents_fail() {
        assert!(PathIndex::build("<a><b/>").is_err());
        assert!(PathIndex::build("   ").is_err());
        assert!(PathIndex::build("<a/><b/>").is_err());
    }

    #[test]
    fn bad_attributes_entities_and_stray_text_fail() {
        for xml in [
            r#"<a x="1" x="2"/>"#,
            "<a b/>",
            "<a>&undefined;</a>",
            r#"<a title="&undefined;"/>"#,
            "<a/>junk",
            "junk<a/>",
            "<a/><![CDATA[x]]>",
        ] {
            let err = SourceDocument::parse("bad.xml", xml).unwrap_err();
            assert!(matches!(err, ValidatorError::Parse { .. }), "{xml}: {err:?}");
        }
    }

    #[test]
    fn whitespace_around_root_is_accepted() {
        assert!(PathIndex::build("<?xml version=\"1.0\"?>\n\n<a>&amp;</a>\n  \n").is_ok());
    }

    #[test]
    fn source_document_parse_error_names_file() {
        let err = SourceDocument::parse("bad.xml", "<a>").unwrap_err();
        assert!(matches!(err, ValidatorError::Parse { ref file, .. } if file == "bad.xml"));
    }
}
