//! Validation toolkit for ALTO and PAGE layout files (schemas, Segmonto
//! taxonomy, emptiness and image links).
//!
//! # Examples
//! ```rust
//! use htrvx_core::config::ValidationConfig;
//! use htrvx_core::document::{Layout, LayoutDocument, parse_xml_str};
//!
//! let doc = parse_xml_str(r#"<PcGts><Page imageFilename="p.png"/></PcGts>"#)?;
//! let model = LayoutDocument::new(doc, ValidationConfig::default().format)?;
//! assert_eq!(model.image_reference()?.as_deref(), Some("p.png"));
//! # Ok::<(), htrvx_core::Error>(())
//! ```
pub mod config;
pub mod document;
pub mod report;
pub mod rules;
pub mod run;
pub mod schema;

use thiserror::Error;

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::ConfigParseError),
    #[error(transparent)]
    Document(#[from] document::DocumentError),
    #[error(transparent)]
    Schema(#[from] schema::SchemaError),
    #[error(transparent)]
    Fetch(#[from] schema::FetchError),
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::config::ConfigParseError;
    use crate::document::DocumentError;
    use crate::schema::{FetchError, SchemaError};

    #[test]
    fn error_conversions_cover_variants() {
        let err: Error = ConfigParseError::Format {
            input: "hocr".into(),
        }
        .into();
        assert!(matches!(err, Error::Config(_)));

        let err: Error = DocumentError::MissingRoot.into();
        assert!(matches!(err, Error::Document(_)));

        let err: Error = SchemaError::Unavailable {
            identifier: "a.xsd".into(),
            reason: "no such file".into(),
        }
        .into();
        assert!(matches!(err, Error::Schema(_)));
        assert_eq!(err.to_string(), "schema `a.xsd` is unavailable: no such file");

        let err: Error = FetchError::Status {
            url: "https://example.org/a.xsd".into(),
            status: 404,
        }
        .into();
        assert!(matches!(err, Error::Fetch(_)));
    }
}
