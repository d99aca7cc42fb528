//! Per-document orchestration of every requested check.
use libxml::tree::Document;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ValidationConfig;
use crate::document::{DocumentError, ImageLink, LayoutDocument, Level, parse_xml_file, parse_xml_str};
use crate::report::{CheckOutcome, FileReport, Status, Task, ValidationRun};
use crate::rules::{Evaluation, describe_empty, describe_taxonomy_errors, evaluate};
use crate::schema::{
    CompiledSchema, HttpFetcher, SchemaError, SchemaFetcher, SchemaStore, describe_schema_issues,
};

const LEVELS: [Level; 2] = [Level::Zone, Level::Line];

/// One input of a run.
pub enum DocumentSource {
    Path(PathBuf),
    /// XML held in memory; has no directory for image resolution.
    Text(String),
    /// An already parsed document, without a source path.
    Parsed(Document),
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            DocumentSource::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            DocumentSource::Parsed(_) => f.write_str("Parsed(..)"),
        }
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        DocumentSource::Path(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        DocumentSource::Path(path.to_path_buf())
    }
}

impl From<Document> for DocumentSource {
    fn from(doc: Document) -> Self {
        DocumentSource::Parsed(doc)
    }
}

impl DocumentSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DocumentSource::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Report label: the path, or `File NNN` for the 1-based `index`.
    pub fn label(&self, index: usize) -> String {
        match self {
            DocumentSource::Path(path) => path.display().to_string(),
            _ => format!("File {index:03}"),
        }
    }

    fn into_document(self) -> Result<Document, DocumentError> {
        match self {
            DocumentSource::Path(path) => parse_xml_file(&path),
            DocumentSource::Text(xml) => parse_xml_str(&xml),
            DocumentSource::Parsed(doc) => Ok(doc),
        }
    }
}

/// Runs the configured checks over documents.
///
/// Compiled schemas are kept for the lifetime of the validator, so every
/// document of a run that shares a schema compiles it once.
///
/// # Examples
/// ```rust
/// use htrvx_core::config::ValidationConfig;
/// use htrvx_core::run::{DocumentSource, Validator};
/// use htrvx_core::schema::{SchemaCache, SchemaStore};
///
/// let cache = SchemaCache::open(std::env::temp_dir().join("htrvx-doc-cache"))?;
/// let config = ValidationConfig {
///     segmonto: true,
///     ..ValidationConfig::default()
/// };
/// let mut validator = Validator::new(config, SchemaStore::new(cache)?);
/// let report = validator.validate(DocumentSource::Text(
///     r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#"><Layout><Page><PrintSpace/></Page></Layout></alto>"#.into(),
/// ));
/// assert!(report.passed());
/// # Ok::<(), htrvx_core::Error>(())
/// ```
pub struct Validator<F = HttpFetcher> {
    config: ValidationConfig,
    store: SchemaStore<F>,
    compiled: HashMap<PathBuf, CompiledSchema>,
}

impl<F: SchemaFetcher> Validator<F> {
    pub fn new(config: ValidationConfig, store: SchemaStore<F>) -> Self {
        Validator {
            config,
            store,
            compiled: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn store(&self) -> &SchemaStore<F> {
        &self.store
    }

    /// Validate every source in order. One file failing never stops the run.
    pub fn run<I>(&mut self, sources: I) -> ValidationRun
    where
        I: IntoIterator<Item = DocumentSource>,
    {
        let mut run = ValidationRun::new();
        for (index, source) in sources.into_iter().enumerate() {
            let label = source.label(index + 1);
            let report = self.validate(source);
            tracing::debug!(file = %label, passed = report.passed(), "file validated");
            run.push(label, report);
        }
        run
    }

    pub fn validate(&mut self, source: DocumentSource) -> FileReport {
        let path = source.path().map(Path::to_path_buf);
        let mut report = FileReport::new();
        let doc = match source.into_document() {
            Ok(doc) => doc,
            Err(error) => {
                tracing::warn!(%error, "document could not be parsed, failing every requested check");
                for outcome in self.unusable(&error, true) {
                    report.push(outcome);
                }
                return report;
            }
        };

        // Runs before the layout model takes ownership of the document.
        let schema = self
            .config
            .xsd
            .then(|| self.schema_outcome(&doc, path.as_deref()));

        if self.config.needs_layout_model() {
            let outcomes = match LayoutDocument::new(doc, self.config.format) {
                Ok(model) => self.layout_outcomes(&model, path.as_deref()),
                Err(error) => {
                    tracing::warn!(%error, "layout model unavailable");
                    self.unusable(&error, false)
                }
            };
            for outcome in outcomes {
                report.push(outcome);
            }
        }
        if let Some(schema) = schema {
            report.push(schema);
        }
        report
    }

    /// Failures for each requested check that needs what `error` prevented.
    fn unusable(&self, error: &DocumentError, with_schema: bool) -> Vec<CheckOutcome> {
        let failure = |task: Task, level: Option<Level>| {
            let outcome = CheckOutcome::new(Status::Failure, task)
                .with_message("document could not be read")
                .with_details(vec![error.to_string()]);
            match level {
                Some(level) => outcome.at_level(level),
                None => outcome,
            }
        };
        let mut outcomes = Vec::new();
        for level in LEVELS {
            if self.config.taxonomy(level).is_some() {
                outcomes.push(failure(Task::Taxonomy, Some(level)));
            }
        }
        if self.config.check_empty {
            for level in LEVELS {
                outcomes.push(failure(Task::Emptiness, Some(level)));
            }
        }
        if self.config.check_image {
            outcomes.push(failure(Task::ImageLink, None));
        }
        if with_schema && self.config.xsd {
            outcomes.push(failure(Task::Schema, None));
        }
        outcomes
    }

    fn layout_outcomes(&self, model: &LayoutDocument, path: Option<&Path>) -> Vec<CheckOutcome> {
        let evaluation = match evaluate(model, &self.config.rules()) {
            Ok(evaluation) => evaluation,
            Err(error) => return self.unusable(&error, false),
        };
        let mut outcomes = Vec::new();
        for level in LEVELS {
            if self.config.taxonomy(level).is_some() {
                outcomes.push(self.taxonomy_outcome(&evaluation, level));
            }
        }
        if self.config.check_empty {
            for level in LEVELS {
                outcomes.push(self.emptiness_outcome(&evaluation, level));
            }
        }
        if self.config.check_image {
            outcomes.push(image_outcome(model, path));
        }
        outcomes
    }

    fn taxonomy_outcome(&self, evaluation: &Evaluation, level: Level) -> CheckOutcome {
        let errors = evaluation.taxonomy_errors(level);
        if errors.is_empty() {
            return CheckOutcome::new(Status::Success, Task::Taxonomy).at_level(level);
        }
        CheckOutcome::new(Status::Failure, Task::Taxonomy)
            .at_level(level)
            .with_message(format!("{} wrongly tagged {level}s", errors.len()))
            .with_details(describe_taxonomy_errors(errors, level, self.config.group))
    }

    fn emptiness_outcome(&self, evaluation: &Evaluation, level: Level) -> CheckOutcome {
        let count = evaluation.empty_elements(level).count();
        if count == 0 {
            return CheckOutcome::new(Status::Success, Task::Emptiness).at_level(level);
        }
        let status = if self.config.raise_empty {
            Status::Failure
        } else {
            Status::Warning
        };
        CheckOutcome::new(status, Task::Emptiness)
            .at_level(level)
            .with_message(format!("{count} empty {level}(s) found"))
            .with_details(describe_empty(
                evaluation.empty_elements(level),
                level,
                self.config.group,
            ))
    }

    fn schema_outcome(&mut self, doc: &Document, path: Option<&Path>) -> CheckOutcome {
        let base_dir = path.and_then(Path::parent);
        let resolved = match &self.config.schema {
            Some(identifier) => self.store.resolve(identifier).map(Some),
            None => self.store.retrieve_from_document(doc, base_dir),
        };
        let schema_path = match resolved {
            Ok(Some(schema_path)) => schema_path,
            Ok(None) => {
                return CheckOutcome::new(Status::Failure, Task::Schema)
                    .with_message("no schema declared")
                    .with_details(vec![
                        "the root element carries no xsi:schemaLocation ending in .xsd".into(),
                    ]);
            }
            Err(error) => return schema_unavailable(&error),
        };
        let compiled = match self.compiled_schema(schema_path) {
            Ok(compiled) => compiled,
            Err(error) => return schema_unavailable(&error),
        };
        match compiled.validate(doc) {
            Ok(()) => CheckOutcome::new(Status::Success, Task::Schema),
            Err(issues) => {
                let mut details = describe_schema_issues(&issues, self.config.group);
                if details.is_empty() {
                    details.push("libxml reported no diagnostics".into());
                }
                CheckOutcome::new(Status::Failure, Task::Schema)
                    .with_message("validation failed")
                    .with_details(details)
            }
        }
    }

    fn compiled_schema(&mut self, path: PathBuf) -> Result<&mut CompiledSchema, SchemaError> {
        match self.compiled.entry(path) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let compiled = CompiledSchema::compile(entry.key(), self.store.cache())?;
                Ok(entry.insert(compiled))
            }
        }
    }
}

fn schema_unavailable(error: &SchemaError) -> CheckOutcome {
    tracing::warn!(%error, "schema check failed before validation");
    CheckOutcome::new(Status::Failure, Task::Schema)
        .with_message("schema unavailable")
        .with_details(error.details())
}

fn image_outcome(model: &LayoutDocument, path: Option<&Path>) -> CheckOutcome {
    let failure = |message: String, details: Vec<String>| {
        CheckOutcome::new(Status::Failure, Task::ImageLink)
            .with_message(message)
            .with_details(details)
    };
    match model.check_image(path) {
        Ok(ImageLink::Found(_)) => CheckOutcome::new(Status::Success, Task::ImageLink),
        Ok(ImageLink::Missing(image)) => failure(
            format!("image file at path `{}` not found", image.display()),
            vec![image.display().to_string()],
        ),
        Ok(ImageLink::NotDeclared) => failure("no image file is declared in the document".into(), Vec::new()),
        Ok(ImageLink::NoSourcePath { reference }) => failure(
            format!("cannot resolve image `{reference}` without the document's path"),
            vec!["the document was not read from a file".into()],
        ),
        Err(error) => failure("image reference could not be read".into(), vec![error.to_string()]),
    }
}
