//! PAGE documents: categories come from the `custom` attribute.
use libxml::tree::{Document, Node};

use super::annotation::structure_type;
use super::{
    DocumentError, Element, Elements, Layout, Level, children_named, evaluate_nodes, first_text,
    has_descendant,
};

// Every element under `Page` whose local name ends in `Region`.
const ZONES_XPATH: &str = "//*[local-name()='Page']//*[substring(local-name(), \
    string-length(local-name()) - 5) = 'Region']";
const LINES_XPATH: &str = "//*[local-name()='TextLine']";
const IMAGE_XPATH: &str = "//*[local-name()='Page']/@imageFilename";

pub struct PageDocument {
    doc: Document,
}

impl PageDocument {
    pub fn new(doc: Document) -> Self {
        PageDocument { doc }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn element(&self, node: &Node, kind: Level, check_empty: bool) -> Element {
        let category = node
            .get_attribute("custom")
            .and_then(|custom| structure_type(&custom));
        let mut element = Element::new(node, "id", kind, category);
        if check_empty {
            element.has_content = Some(match kind {
                Level::Zone => has_descendant(node, "TextLine"),
                Level::Line => line_has_text(node),
            });
        }
        element
    }
}

fn line_has_text(line: &Node) -> bool {
    children_named(line, "TextEquiv")
        .flat_map(|equiv| children_named(&equiv, "Unicode").collect::<Vec<_>>())
        .any(|unicode| !unicode.get_content().trim().is_empty())
}

impl Layout for PageDocument {
    fn zones(&self, check_empty: bool) -> Result<Elements<'_>, DocumentError> {
        let nodes = evaluate_nodes(&self.doc, ZONES_XPATH)?;
        Ok(Box::new(nodes.into_iter().map(move |node| {
            self.element(&node, Level::Zone, check_empty)
        })))
    }

    fn lines(&self, check_empty: bool) -> Result<Elements<'_>, DocumentError> {
        let nodes = evaluate_nodes(&self.doc, LINES_XPATH)?;
        Ok(Box::new(nodes.into_iter().map(move |node| {
            self.element(&node, Level::Line, check_empty)
        })))
    }

    fn image_reference(&self) -> Result<Option<String>, DocumentError> {
        first_text(&self.doc, IMAGE_XPATH)
    }
}
