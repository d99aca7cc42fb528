mod common;

use htrvx_core::config::FormatChoice;
use htrvx_core::document::{Dialect, Element, ImageLink, Layout, LayoutDocument, parse_xml_file};

fn load(relative: &str) -> LayoutDocument {
    let doc = parse_xml_file(&common::fixture(relative)).expect("fixture parses");
    LayoutDocument::new(doc, FormatChoice::Auto).expect("known dialect")
}

fn summary(elements: impl Iterator<Item = Element>) -> Vec<(String, Option<String>)> {
    elements.map(|e| (e.id, e.category)).collect()
}

#[test]
fn alto_fixture_resolves_categories_through_tags() {
    let alto = load("alto/working.xml");
    assert_eq!(alto.dialect(), Dialect::Alto);
    assert_eq!(
        summary(alto.zones(false).unwrap()),
        [
            ("main_zone".to_string(), Some("MainZone".to_string())),
            ("margin_zone".to_string(), Some("MarginTextZone:note".to_string())),
        ]
    );
    assert_eq!(
        summary(alto.lines(false).unwrap()),
        [
            ("line_1".to_string(), Some("HeadingLine:rubric".to_string())),
            ("line_2".to_string(), Some("DefaultLine".to_string())),
            ("line_3".to_string(), Some("DefaultLine".to_string())),
        ]
    );
}

#[test]
fn page_fixture_reads_structure_types() {
    let page = load("page/working.xml");
    assert_eq!(page.dialect(), Dialect::Page);
    assert_eq!(
        summary(page.zones(false).unwrap()),
        [
            ("main_zone".to_string(), Some("MainZone:column#1".to_string())),
            ("margin_zone".to_string(), Some("MarginTextZone".to_string())),
            ("decoration".to_string(), Some("GraphicZone".to_string())),
        ]
    );
    assert_eq!(page.lines(false).unwrap().count(), 3);
}

#[test]
fn page_untagged_region_has_no_category() {
    let page = load("page/segmonto_wrong_tag.xml");
    let zones: Vec<Element> = page.zones(false).unwrap().collect();
    assert_eq!(zones[1].id, "no_tag_zone");
    assert_eq!(zones[1].category, None);
}

#[test]
fn emptiness_is_detected_in_both_dialects() {
    let alto = load("alto/empty_zone.xml");
    let empty: Vec<String> = alto
        .zones(true)
        .unwrap()
        .filter(Element::is_empty)
        .map(|e| e.id)
        .collect();
    assert_eq!(empty, ["empty_zone"]);

    let page = load("page/empty_elements.xml");
    let empty_zones: Vec<String> = page
        .zones(true)
        .unwrap()
        .filter(Element::is_empty)
        .map(|e| e.id)
        .collect();
    let empty_lines: Vec<String> = page
        .lines(true)
        .unwrap()
        .filter(Element::is_empty)
        .map(|e| e.id)
        .collect();
    assert_eq!(empty_zones, ["empty_zone"]);
    assert_eq!(empty_lines, ["empty_line"]);
}

#[test]
fn image_links_resolve_next_to_the_document() {
    let path = common::fixture("alto/working.xml");
    let found = load("alto/working.xml").check_image(Some(&path)).unwrap();
    assert_eq!(found, ImageLink::Found(common::fixture("alto/folio.jpg")));

    let path = common::fixture("alto/missing_image.xml");
    let missing = load("alto/missing_image.xml").check_image(Some(&path)).unwrap();
    assert_eq!(
        missing,
        ImageLink::Missing(common::fixture("alto/scans/missing.jpg"))
    );

    let path = common::fixture("alto/segmonto_empty_tag.xml");
    let undeclared = load("alto/segmonto_empty_tag.xml")
        .check_image(Some(&path))
        .unwrap();
    assert_eq!(undeclared, ImageLink::NotDeclared);

    let path = common::fixture("page/working.xml");
    let page = load("page/working.xml").check_image(Some(&path)).unwrap();
    assert_eq!(page, ImageLink::Found(common::fixture("page/folio.jpg")));
}

#[test]
fn forcing_the_wrong_dialect_finds_nothing() {
    let doc = parse_xml_file(&common::fixture("page/working.xml")).unwrap();
    let forced = LayoutDocument::new(doc, FormatChoice::Alto).unwrap();
    assert_eq!(forced.zones(false).unwrap().count(), 0);
}
