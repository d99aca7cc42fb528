//! XSD compilation and document validation with libxml.
//!
//! Before compiling, every `include`/`import`/`redefine`/`override` in the
//! schema tree is rewritten to point at a local file: cached copies for URLs,
//! files on disk for relative paths. Nested references are never downloaded,
//! and schemas are parsed with network access disabled.
use libxml::{
    error::StructuredError,
    schemas::{SchemaParserContext, SchemaValidationContext},
    tree::Document,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{SchemaCache, SchemaError, is_remote};
use crate::document::{evaluate_nodes, parse_xml_file};

const REFERENCES_XPATH: &str = "//*[namespace-uri()='http://www.w3.org/2001/XMLSchema' \
    and (local-name()='include' or local-name()='import' or local-name()='redefine' \
    or local-name()='override')][@schemaLocation]";

static ALTO_NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{http://www\.loc\.gov/standards/alto/ns-v\d#\}")
        .expect("ALTO namespace pattern is a valid regex")
});

/// One violation reported by schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub line: Option<usize>,
    pub message: String,
}

impl From<StructuredError> for SchemaIssue {
    fn from(error: StructuredError) -> Self {
        SchemaIssue {
            line: error.line.and_then(|line| usize::try_from(line).ok()),
            message: error
                .message
                .as_deref()
                .unwrap_or("unknown schema error")
                .trim()
                .to_string(),
        }
    }
}

impl SchemaIssue {
    /// Message with the ALTO namespace shortened to `alto:`.
    pub fn simplified_message(&self) -> String {
        ALTO_NAMESPACE.replace_all(&self.message, "alto:").into_owned()
    }
}

/// Describe schema issues either one per line, or grouped by message with
/// the lines they occur on (first occurrence order).
pub fn describe_schema_issues(issues: &[SchemaIssue], group: bool) -> Vec<String> {
    if !group {
        return issues
            .iter()
            .map(|issue| {
                format!(
                    "Line {:04}: {}",
                    issue.line.unwrap_or(0),
                    issue.simplified_message()
                )
            })
            .collect();
    }
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for issue in issues {
        let message = issue.simplified_message();
        let line = issue.line.unwrap_or(0).to_string();
        match grouped.iter_mut().find(|(known, _)| *known == message) {
            Some((_, lines)) => lines.push(line),
            None => grouped.push((message, vec![line])),
        }
    }
    grouped
        .into_iter()
        .map(|(message, lines)| format!("{message} on line(s): {}", lines.join(", ")))
        .collect()
}

/// A compiled schema ready to validate documents.
pub struct CompiledSchema {
    path: PathBuf,
    ctx: SchemaValidationContext,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile the schema at `path`, resolving nested references through
    /// `cache` or the filesystem only.
    pub fn compile(path: &Path, cache: &SchemaCache) -> Result<Self, SchemaError> {
        let origin = cache.origin_of(path);
        let localized = Localizer::new(cache).localize(path, origin.as_deref())?;
        let localized_str = localized.to_str().ok_or_else(|| SchemaError::Unavailable {
            identifier: localized.display().to_string(),
            reason: "path is not valid UTF-8".into(),
        })?;
        let mut parser_ctx = SchemaParserContext::from_file(localized_str);
        let ctx = SchemaValidationContext::from_parser(&mut parser_ctx).map_err(|errors| {
            SchemaError::Compile {
                path: path.to_path_buf(),
                errors: errors
                    .into_iter()
                    .map(|error| SchemaIssue::from(error).message)
                    .collect(),
            }
        })?;
        tracing::debug!(path = %path.display(), "schema compiled");
        Ok(CompiledSchema {
            path: path.to_path_buf(),
            ctx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn validate(&mut self, doc: &Document) -> Result<(), Vec<SchemaIssue>> {
        self.ctx
            .validate_document(doc)
            .map_err(|errors| errors.into_iter().map(SchemaIssue::from).collect())
    }
}

struct Localizer<'a> {
    cache: &'a SchemaCache,
    done: HashMap<PathBuf, PathBuf>,
}

impl<'a> Localizer<'a> {
    fn new(cache: &'a SchemaCache) -> Self {
        Localizer {
            cache,
            done: HashMap::new(),
        }
    }

    /// Return a file equivalent to `file` whose references are all local.
    fn localize(&mut self, file: &Path, origin_url: Option<&str>) -> Result<PathBuf, SchemaError> {
        if let Some(done) = self.done.get(file) {
            return Ok(done.clone());
        }
        let doc = parse_xml_file(file)
            .map_err(|e| SchemaError::unavailable(file.display().to_string(), e))?;
        let references = evaluate_nodes(&doc, REFERENCES_XPATH)
            .map_err(|e| SchemaError::unavailable(file.display().to_string(), e))?;
        if references.is_empty() {
            self.done.insert(file.to_path_buf(), file.to_path_buf());
            return Ok(file.to_path_buf());
        }

        // Registered before recursing so that cyclic imports terminate.
        let target = self.cache.localized_path(file);
        self.done.insert(file.to_path_buf(), target.clone());

        for mut node in references {
            let Some(location) = node.get_attribute("schemaLocation") else {
                continue;
            };
            let (nested, nested_url) = self.locate(&location, file, origin_url)?;
            let localized = self.localize(&nested, nested_url.as_deref())?;
            node.set_attribute("schemaLocation", &localized.to_string_lossy())
                .map_err(|e| SchemaError::unavailable(location.clone(), e))?;
        }
        self.cache.write_atomic(&target, doc.to_string().as_bytes())?;
        tracing::debug!(source = %file.display(), localized = %target.display(), "schema references localised");
        Ok(target)
    }

    /// Find the local file for a nested reference.
    fn locate(
        &self,
        location: &str,
        parent: &Path,
        parent_url: Option<&str>,
    ) -> Result<(PathBuf, Option<String>), SchemaError> {
        let url = if is_remote(location) {
            Some(location.to_string())
        } else if let Some(base) = parent_url {
            let joined = reqwest::Url::parse(base)
                .and_then(|base| base.join(location))
                .map_err(|e| SchemaError::unavailable(location, e))?;
            Some(joined.to_string())
        } else {
            None
        };

        if let Some(url) = url {
            return match self.cache.lookup(&url) {
                Some(path) => Ok((path, Some(url))),
                None => Err(SchemaError::unavailable(
                    url,
                    "nested schema reference is not in the cache",
                )),
            };
        }

        let path = parent
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(location);
        let path = std::fs::canonicalize(&path).map_err(|e| {
            SchemaError::unavailable(path.display().to_string(), format!("nested schema reference: {e}"))
        })?;
        Ok((path, None))
    }
}
