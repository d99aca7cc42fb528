mod common;

use common::{CountingFetcher, offline_store};
use htrvx_core::document::parse_xml_file;
use htrvx_core::schema::{CompiledSchema, SchemaError, describe_schema_issues};

const MAIN: &str = "https://schemas.example.org/split/main.xsd";
const TYPES: &str = "https://schemas.example.org/split/types.xsd";

const MAIN_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns="urn:htrvx:test" targetNamespace="urn:htrvx:test"
           elementFormDefault="qualified">
  <xs:include schemaLocation="types.xsd"/>
  <xs:element name="record" type="RecordType"/>
</xs:schema>"#;

const TYPES_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns="urn:htrvx:test" targetNamespace="urn:htrvx:test"
           elementFormDefault="qualified">
  <xs:complexType name="RecordType">
    <xs:sequence>
      <xs:element name="title" type="xs:string"/>
      <xs:element name="folio" type="xs:positiveInteger" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:complexType>
</xs:schema>"#;

#[test]
fn local_includes_are_resolved_from_disk() {
    let (store, _dir) = offline_store(CountingFetcher::new());
    let mut schema =
        CompiledSchema::compile(&common::fixture("schemas/record.xsd"), store.cache()).unwrap();

    let valid = parse_xml_file(&common::fixture("schemas/record_valid.xml")).unwrap();
    assert!(schema.validate(&valid).is_ok());

    let invalid = parse_xml_file(&common::fixture("schemas/record_invalid.xml")).unwrap();
    let issues = schema.validate(&invalid).unwrap_err();
    assert!(!issues.is_empty());
    assert!(issues.iter().any(|issue| issue.line == Some(6)));
    assert!(store.fetcher().calls().is_empty());
}

#[test]
fn grouped_issue_descriptions_merge_repeated_messages() {
    let (store, _dir) = offline_store(CountingFetcher::new());
    let mut schema =
        CompiledSchema::compile(&common::fixture("schemas/record.xsd"), store.cache()).unwrap();
    let invalid = parse_xml_file(&common::fixture("schemas/record_invalid.xml")).unwrap();
    let issues = schema.validate(&invalid).unwrap_err();

    let ungrouped = describe_schema_issues(&issues, false);
    assert_eq!(ungrouped.len(), issues.len());
    assert!(ungrouped.iter().all(|line| line.starts_with("Line 000")));

    let grouped = describe_schema_issues(&issues, true);
    assert!(grouped.len() <= issues.len());
    assert!(grouped.iter().all(|line| line.contains(" on line(s): ")));
}

#[test]
fn missing_local_include_fails_hard() {
    let (store, _dir) = offline_store(CountingFetcher::new());
    let err = CompiledSchema::compile(&common::fixture("schemas/broken-include.xsd"), store.cache())
        .unwrap_err();
    assert!(matches!(err, SchemaError::Unavailable { .. }));
    assert!(err.to_string().contains("does-not-exist.xsd"));
}

#[test]
fn remote_includes_must_already_be_cached() {
    let fetcher = CountingFetcher::new()
        .serve(MAIN, MAIN_BODY)
        .serve(TYPES, TYPES_BODY);
    let (store, _dir) = offline_store(fetcher);

    let main = store.resolve(MAIN).unwrap();
    let err = CompiledSchema::compile(&main, store.cache()).unwrap_err();
    assert!(
        matches!(&err, SchemaError::Unavailable { identifier, .. } if identifier == TYPES),
        "unexpected error: {err}"
    );
    assert_eq!(store.fetcher().calls(), [MAIN], "nested references are never fetched");

    store.resolve(TYPES).unwrap();
    let mut schema = CompiledSchema::compile(&main, store.cache()).unwrap();
    let valid = parse_xml_file(&common::fixture("schemas/record_valid.xml")).unwrap();
    assert!(schema.validate(&valid).is_ok());
}

#[test]
fn bundled_alto_profile_accepts_working_fixture() {
    let (store, _dir) = offline_store(CountingFetcher::new());
    let path = store.resolve("ALTO-Segmonto").unwrap();
    let mut schema = CompiledSchema::compile(&path, store.cache()).unwrap();

    let doc = parse_xml_file(&common::fixture("alto/working.xml")).unwrap();
    assert!(schema.validate(&doc).is_ok());
}

#[test]
fn bundled_alto_profile_reports_unexpected_elements() {
    let (store, _dir) = offline_store(CountingFetcher::new());
    let path = store.resolve("ALTO-Segmonto").unwrap();
    let mut schema = CompiledSchema::compile(&path, store.cache()).unwrap();

    let doc = parse_xml_file(&common::fixture("alto/schema_error.xml")).unwrap();
    let issues = schema.validate(&doc).unwrap_err();
    let details = describe_schema_issues(&issues, false);
    assert!(
        details.iter().any(|line| line.contains("alto:DescriptionW")),
        "{details:?}"
    );
}
