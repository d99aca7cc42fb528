//! Dialect-agnostic view of ALTO and PAGE layout documents.
mod alto;
mod annotation;
mod page;

pub use alto::AltoDocument;
pub use annotation::{Annotations, parse_custom_attribute};
pub use page::PageDocument;

use libxml::{
    parser::{Parser, ParserOptions, XmlParseError},
    tree::{Document, Node},
    xpath,
};
use quick_xml::{Reader, events::Event};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::FormatChoice;

/// Identifier given to elements that do not carry one.
pub const UNKNOWN_ID: &str = "UnknownID";

/// Errors raised while reading a layout document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },
    #[error("document has no root element")]
    MissingRoot,
    #[error("unrecognised layout dialect (root element `{root}`)")]
    UnknownDialect { root: String },
    #[error("XPath error: {0}")]
    XPath(String),
}

/// Structural level of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Zone,
    Line,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Zone => "zone",
            Level::Line => "line",
        }
    }

    /// Label used when describing a single element.
    pub(crate) fn element_label(&self) -> &'static str {
        match self {
            Level::Zone => "Region",
            Level::Line => "Line",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One zone or line read from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: String,
    pub kind: Level,
    /// Resolved semantic type, `None` when untagged or unresolvable.
    pub category: Option<String>,
    /// Only computed when emptiness checking was requested.
    pub has_content: Option<bool>,
}

impl Element {
    pub(crate) fn new(node: &Node, id_attribute: &str, kind: Level, category: Option<String>) -> Self {
        Element {
            id: node
                .get_attribute(id_attribute)
                .unwrap_or_else(|| UNKNOWN_ID.to_string()),
            kind,
            category,
            has_content: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.has_content == Some(false)
    }
}

/// Lazy sequence of elements; every call to [`Layout::zones`] or
/// [`Layout::lines`] walks the document again.
pub type Elements<'a> = Box<dyn Iterator<Item = Element> + 'a>;

/// Capabilities shared by both layout dialects.
pub trait Layout {
    fn zones(&self, check_empty: bool) -> Result<Elements<'_>, DocumentError>;
    fn lines(&self, check_empty: bool) -> Result<Elements<'_>, DocumentError>;
    /// Image path as written in the document, not yet resolved.
    fn image_reference(&self) -> Result<Option<String>, DocumentError>;
}

/// The two supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Alto,
    Page,
}

impl Dialect {
    /// Detect the dialect from the root element name.
    pub fn detect(doc: &Document) -> Result<Dialect, DocumentError> {
        let root = doc.get_root_element().ok_or(DocumentError::MissingRoot)?;
        match root.get_name().as_str() {
            "alto" => Ok(Dialect::Alto),
            "PcGts" => Ok(Dialect::Page),
            other => Err(DocumentError::UnknownDialect {
                root: other.to_string(),
            }),
        }
    }

    fn choose(doc: &Document, format: FormatChoice) -> Result<Dialect, DocumentError> {
        match format {
            FormatChoice::Alto => Ok(Dialect::Alto),
            FormatChoice::Page => Ok(Dialect::Page),
            FormatChoice::Auto => Dialect::detect(doc),
        }
    }
}

/// Outcome of resolving a document's image reference on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLink {
    NotDeclared,
    /// The document was not read from a file, so there is no directory to
    /// resolve the reference against.
    NoSourcePath { reference: String },
    Missing(PathBuf),
    Found(PathBuf),
}

/// A parsed layout document of either dialect.
pub enum LayoutDocument {
    Alto(AltoDocument),
    Page(PageDocument),
}

impl LayoutDocument {
    pub fn new(doc: Document, format: FormatChoice) -> Result<Self, DocumentError> {
        match Dialect::choose(&doc, format)? {
            Dialect::Alto => Ok(LayoutDocument::Alto(AltoDocument::new(doc)?)),
            Dialect::Page => Ok(LayoutDocument::Page(PageDocument::new(doc))),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            LayoutDocument::Alto(_) => Dialect::Alto,
            LayoutDocument::Page(_) => Dialect::Page,
        }
    }

    pub fn document(&self) -> &Document {
        match self {
            LayoutDocument::Alto(alto) => alto.document(),
            LayoutDocument::Page(page) => page.document(),
        }
    }

    /// Join the declared image reference against the directory of
    /// `source_path` and check that the file exists.
    pub fn check_image(&self, source_path: Option<&Path>) -> Result<ImageLink, DocumentError> {
        let Some(reference) = self.image_reference()? else {
            return Ok(ImageLink::NotDeclared);
        };
        let Some(source_path) = source_path else {
            return Ok(ImageLink::NoSourcePath { reference });
        };
        let directory = source_path.parent().unwrap_or_else(|| Path::new(""));
        let image = directory.join(&reference);
        if image.is_file() {
            Ok(ImageLink::Found(image))
        } else {
            Ok(ImageLink::Missing(image))
        }
    }
}

impl Layout for LayoutDocument {
    fn zones(&self, check_empty: bool) -> Result<Elements<'_>, DocumentError> {
        match self {
            LayoutDocument::Alto(alto) => alto.zones(check_empty),
            LayoutDocument::Page(page) => page.zones(check_empty),
        }
    }

    fn lines(&self, check_empty: bool) -> Result<Elements<'_>, DocumentError> {
        match self {
            LayoutDocument::Alto(alto) => alto.lines(check_empty),
            LayoutDocument::Page(page) => page.lines(check_empty),
        }
    }

    fn image_reference(&self) -> Result<Option<String>, DocumentError> {
        match self {
            LayoutDocument::Alto(alto) => alto.image_reference(),
            LayoutDocument::Page(page) => page.image_reference(),
        }
    }
}

fn parser_options() -> ParserOptions<'static> {
    ParserOptions {
        recover: false,
        no_net: true,
        ..ParserOptions::default()
    }
}

/// Parse an XML file with network access disabled.
pub fn parse_xml_file(path: &Path) -> Result<Document, DocumentError> {
    let source_name = path.display().to_string();
    // libxml only reports a null pointer for missing files
    if !path.is_file() {
        return Err(DocumentError::Parse {
            source_name,
            message: "file not found".into(),
        });
    }
    let path_str = path.to_str().ok_or_else(|| DocumentError::Parse {
        source_name: source_name.clone(),
        message: "path is not valid UTF-8".into(),
    })?;
    Parser::default()
        .parse_file_with_options(path_str, parser_options())
        .map_err(|e| {
            let xml = fs::read_to_string(path).ok();
            DocumentError::Parse {
                source_name,
                message: describe_parse_failure(xml.as_deref(), &e),
            }
        })
}

/// Parse an in-memory XML string with network access disabled.
pub fn parse_xml_str(xml: &str) -> Result<Document, DocumentError> {
    Parser::default()
        .parse_string_with_options(xml, parser_options())
        .map_err(|e| DocumentError::Parse {
            source_name: "<memory>".into(),
            message: describe_parse_failure(Some(xml), &e),
        })
}

fn describe_parse_failure(xml: Option<&str>, error: &XmlParseError) -> String {
    match error {
        XmlParseError::FileOpenError => "cannot open file".into(),
        XmlParseError::DocumentTooLarge => "document is too large".into(),
        _ => xml
            .and_then(locate_syntax_error)
            .unwrap_or_else(|| "document is not well-formed XML".into()),
    }
}

/// First syntax error in `xml` with its line number, as quick-xml sees it.
fn locate_syntax_error(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(error) => {
                let offset = usize::try_from(reader.error_position())
                    .ok()?
                    .min(xml.len());
                let line = xml.as_bytes()[..offset]
                    .iter()
                    .filter(|&&byte| byte == b'\n')
                    .count()
                    + 1;
                return Some(format!("line {line}: {error}"));
            }
        }
    }
}

pub(crate) fn evaluate_nodes(doc: &Document, expr: &str) -> Result<Vec<Node>, DocumentError> {
    let ctx = xpath::Context::new(doc)
        .map_err(|e| DocumentError::XPath(format!("XPath context error: {e:?}")))?;
    Ok(ctx
        .evaluate(expr)
        .map_err(|e| DocumentError::XPath(format!("{expr}: {e:?}")))?
        .get_nodes_as_vec())
}

pub(crate) fn first_text(doc: &Document, expr: &str) -> Result<Option<String>, DocumentError> {
    let value = evaluate_nodes(doc, expr)?
        .first()
        .map(|node| node.get_content().trim().to_string());
    Ok(value.filter(|value| !value.is_empty()))
}

pub(crate) fn children_named<'a>(node: &Node, name: &'a str) -> impl Iterator<Item = Node> + 'a {
    node.get_child_elements()
        .into_iter()
        .filter(move |child| child.get_name() == name)
}

pub(crate) fn has_descendant(node: &Node, name: &str) -> bool {
    node.get_child_elements()
        .iter()
        .any(|child| child.get_name() == name || has_descendant(child, name))
}
