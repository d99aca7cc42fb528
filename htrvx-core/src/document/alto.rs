//! ALTO documents: categories come from the `Tags` table through `TAGREFS`.
use libxml::tree::{Document, Node};
use std::collections::HashMap;

use super::{
    DocumentError, Element, Elements, Layout, Level, children_named, evaluate_nodes, first_text,
    has_descendant,
};

const TAGS_XPATH: &str = "(//*[local-name()='Tags'])[1]/*[local-name()='StructureTag' \
    or local-name()='LayoutTag' or local-name()='OtherTag']";
const ZONES_XPATH: &str = "/*[local-name()='alto']/*[local-name()='Layout']/*[local-name()='Page']\
    /*[local-name()='PrintSpace']/*[local-name()='TextBlock' or local-name()='Illustration' \
    or local-name()='GraphicalElement' or local-name()='ComposedBlock']";
const LINES_XPATH: &str = "//*[local-name()='TextLine']";
const IMAGE_XPATH: &str = "/*[local-name()='alto']/*[local-name()='Description']\
    /*[local-name()='sourceImageInformation']/*[local-name()='fileName']";

/// An ALTO document with its tag table resolved.
pub struct AltoDocument {
    doc: Document,
    tags: HashMap<String, String>,
}

impl AltoDocument {
    pub fn new(doc: Document) -> Result<Self, DocumentError> {
        let tags = evaluate_nodes(&doc, TAGS_XPATH)?
            .into_iter()
            .filter_map(|tag| Some((tag.get_attribute("ID")?, tag.get_attribute("LABEL")?)))
            .collect();
        Ok(AltoDocument { doc, tags })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Label of the first reference in `tagrefs` found in the tag table.
    pub fn category(&self, tagrefs: &str) -> Option<String> {
        tagrefs.split_whitespace().find_map(|tagref| {
            self.tags
                .get(tagref)
                .filter(|label| !label.is_empty())
                .cloned()
        })
    }

    fn element(&self, node: &Node, kind: Level, check_empty: bool) -> Element {
        let category = node
            .get_attribute("TAGREFS")
            .and_then(|tagrefs| self.category(&tagrefs));
        let mut element = Element::new(node, "ID", kind, category);
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
    children_named(line, "String")
        .filter_map(|string| string.get_attribute("CONTENT"))
        .any(|content| !content.trim().is_empty())
}

impl Layout for AltoDocument {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_xml_str;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#">
  <Tags>
    <OtherTag ID="BT1" LABEL="MainZone"/>
    <OtherTag ID="LT1" LABEL="DefaultLine"/>
    <OtherTag ID="BLANK" LABEL=""/>
  </Tags>
  <Layout>
    <Page ID="page">
      <PrintSpace>
        <TextBlock ID="tb1" TAGREFS="UNKNOWN BT1">
          <TextLine ID="l1" TAGREFS="LT1"><String CONTENT="Incipit"/></TextLine>
          <TextLine ID="l2" TAGREFS="BLANK"><String CONTENT="   "/></TextLine>
        </TextBlock>
        <Illustration ID="ill1"/>
        <ComposedBlock TAGREFS="BT1"/>
      </PrintSpace>
    </Page>
  </Layout>
</alto>"#;

    fn sample() -> AltoDocument {
        AltoDocument::new(parse_xml_str(SAMPLE).unwrap()).unwrap()
    }

    #[test]
    fn first_resolvable_tagref_wins() {
        let alto = sample();
        assert_eq!(alto.category("MISSING BT1 LT1").as_deref(), Some("MainZone"));
        assert_eq!(alto.category("LT1 BT1").as_deref(), Some("DefaultLine"));
        assert_eq!(alto.category("BLANK"), None);
        assert_eq!(alto.category(""), None);
    }

    #[test]
    fn zones_are_print_space_blocks() {
        let alto = sample();
        let zones: Vec<Element> = alto.zones(true).unwrap().collect();
        let ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, ["tb1", "ill1", "UnknownID"]);
        assert_eq!(zones[0].category.as_deref(), Some("MainZone"));
        assert_eq!(zones[1].category, None);
        assert_eq!(zones[0].has_content, Some(true));
        assert!(zones[1].is_empty());
    }

    #[test]
    fn lines_detect_blank_content_only_on_request() {
        let alto = sample();
        let lines: Vec<Element> = alto.lines(false).unwrap().collect();
        assert!(lines.iter().all(|line| line.has_content.is_none()));

        let lines: Vec<Element> = alto.lines(true).unwrap().collect();
        assert_eq!(lines[0].has_content, Some(true));
        assert!(lines[1].is_empty());
        assert_eq!(lines[1].category, None);
    }

    #[test]
    fn iteration_can_be_repeated() {
        let alto = sample();
        assert_eq!(alto.lines(false).unwrap().count(), 2);
        assert_eq!(alto.lines(false).unwrap().count(), 2);
    }

    #[test]
    fn only_layout_tag_kinds_categorize_elements() {
        let xml = r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#">
  <Tags>
    <NamedEntityTag ID="NE" LABEL="MainZone"/>
    <RoleTag ID="ROLE" LABEL="MainZone"/>
    <StructureTag ID="ST" LABEL="MarginTextZone"/>
    <LayoutTag ID="LT" LABEL="DefaultLine"/>
  </Tags>
  <Layout><Page><PrintSpace>
    <Illustration ID="ill" TAGREFS="NE"/>
    <TextBlock ID="tb" TAGREFS="ROLE ST">
      <TextLine ID="l" TAGREFS="NE LT"/>
    </TextBlock>
  </PrintSpace></Page></Layout>
</alto>"#;
        let alto = AltoDocument::new(parse_xml_str(xml).unwrap()).unwrap();
        let zones: Vec<(String, Option<String>)> = alto
            .zones(false)
            .unwrap()
            .map(|zone| (zone.id, zone.category))
            .collect();
        assert_eq!(
            zones,
            [
                ("ill".to_string(), None),
                ("tb".to_string(), Some("MarginTextZone".to_string())),
            ]
        );
        let line = alto.lines(false).unwrap().next().unwrap();
        assert_eq!(line.category.as_deref(), Some("DefaultLine"));
    }

    #[test]
    fn missing_image_reference_is_none() {
        assert_eq!(sample().image_reference().unwrap(), None);
    }
}
