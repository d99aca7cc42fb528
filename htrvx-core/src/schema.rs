//! Schema resolution: bundled aliases, local paths and cached downloads.
//!
//! Remote schemas are cached under the SHA-256 of their URL with the
//! `http://`/`https://` prefix removed, so both schemes share one entry. A
//! server that serves different content per scheme will only ever be seen
//! through whichever scheme populated the cache first.
pub mod fetch;
pub mod validation;

pub use fetch::{FetchError, HttpFetcher, SchemaFetcher};
pub use validation::{CompiledSchema, SchemaIssue, describe_schema_issues};

use libxml::tree::Document;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Schemas shipped with the tool, by alias.
pub const ALIASES: &[(&str, &str)] = &[("ALTO-Segmonto", "alto-segmonto.xsd")];

/// Errors raised while resolving or compiling a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema `{identifier}` is unavailable: {reason}")]
    Unavailable { identifier: String, reason: String },
    #[error("schema cache error at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("schema {path} could not be compiled")]
    Compile { path: PathBuf, errors: Vec<String> },
}

impl SchemaError {
    fn unavailable(identifier: impl Into<String>, reason: impl ToString) -> Self {
        SchemaError::Unavailable {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }

    /// Lines to show under a failed schema check.
    pub fn details(&self) -> Vec<String> {
        match self {
            SchemaError::Compile { errors, .. } if !errors.is_empty() => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

pub fn is_remote(identifier: &str) -> bool {
    identifier.starts_with("http://") || identifier.starts_with("https://")
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// On-disk cache of downloaded schemas. Entries are never expired.
#[derive(Debug, Clone)]
pub struct SchemaCache {
    dir: PathBuf,
}

impl SchemaCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SchemaError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SchemaError::Cache {
            path: dir.clone(),
            source,
        })?;
        let dir = std::fs::canonicalize(&dir).map_err(|source| SchemaError::Cache {
            path: dir.clone(),
            source,
        })?;
        Ok(SchemaCache { dir })
    }

    /// Default location when none is configured.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("htrvx-schemas")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key of a URL: SHA-256 of the URL without its scheme.
    ///
    /// ```rust
    /// use htrvx_core::schema::SchemaCache;
    ///
    /// assert_eq!(
    ///     SchemaCache::key("http://example.org/a.xsd"),
    ///     SchemaCache::key("https://example.org/a.xsd"),
    /// );
    /// ```
    pub fn key(url: &str) -> String {
        sha256_hex(strip_scheme(url))
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.xsd", Self::key(url)))
    }

    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.path_for(url);
        path.is_file().then_some(path)
    }

    pub fn store(&self, url: &str, body: &[u8]) -> Result<PathBuf, SchemaError> {
        let path = self.path_for(url);
        self.write_atomic(&path, body)?;
        self.write_atomic(&path.with_extension("url"), url.as_bytes())?;
        tracing::info!(url, path = %path.display(), "schema cached");
        Ok(path)
    }

    /// URL a cached file was downloaded from, used to resolve relative
    /// references inside it. Unknown for entries seeded by other tools.
    pub fn origin_of(&self, path: &Path) -> Option<String> {
        if path.parent() != Some(self.dir.as_path()) {
            return None;
        }
        let url = std::fs::read_to_string(path.with_extension("url")).ok()?;
        let url = url.trim();
        (!url.is_empty()).then(|| url.to_string())
    }

    /// Where the copy of `source` with localised references is written.
    pub(crate) fn localized_path(&self, source: &Path) -> PathBuf {
        self.dir
            .join("localized")
            .join(format!("{}.xsd", sha256_hex(&source.to_string_lossy())))
    }

    // Write to a temporary file in the target directory, then rename.
    pub(crate) fn write_atomic(&self, path: &Path, body: &[u8]) -> Result<(), SchemaError> {
        let cache_error = |source| SchemaError::Cache {
            path: path.to_path_buf(),
            source,
        };
        let parent = path.parent().unwrap_or(&self.dir);
        std::fs::create_dir_all(parent).map_err(cache_error)?;
        let mut file = tempfile::NamedTempFile::new_in(parent).map_err(cache_error)?;
        file.write_all(body).map_err(cache_error)?;
        file.persist(path).map_err(|e| cache_error(e.error))?;
        Ok(())
    }
}

/// Turns schema identifiers into local schema files.
///
/// # Examples
/// ```rust,no_run
/// use htrvx_core::schema::{SchemaCache, SchemaStore};
///
/// let store = SchemaStore::new(SchemaCache::open(SchemaCache::default_dir())?)?;
/// let path = store.resolve("https://www.loc.gov/standards/alto/v4/alto-4-2.xsd")?;
/// # let _ = path;
/// # Ok::<(), htrvx_core::Error>(())
/// ```
#[derive(Debug)]
pub struct SchemaStore<F = HttpFetcher> {
    cache: SchemaCache,
    fetcher: F,
    bundled_dir: PathBuf,
}

impl SchemaStore<HttpFetcher> {
    pub fn new(cache: SchemaCache) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(cache, HttpFetcher::new()?))
    }
}

impl<F: SchemaFetcher> SchemaStore<F> {
    pub fn with_fetcher(cache: SchemaCache, fetcher: F) -> Self {
        SchemaStore {
            cache,
            fetcher,
            bundled_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/schemas"),
        }
    }

    /// Directory holding the schemas named in [`ALIASES`].
    pub fn with_bundled_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundled_dir = dir.into();
        self
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve an alias, URL or local path to a schema file.
    pub fn resolve(&self, identifier: &str) -> Result<PathBuf, SchemaError> {
        if let Some((_, file)) = ALIASES.iter().find(|(alias, _)| *alias == identifier) {
            let path = self.bundled_dir.join(file);
            return if path.is_file() {
                Ok(path)
            } else {
                Err(SchemaError::unavailable(
                    identifier,
                    format!("bundled schema {} is missing", path.display()),
                ))
            };
        }
        if is_remote(identifier) {
            return self.resolve_remote(identifier);
        }
        let path = PathBuf::from(identifier);
        if path.is_file() {
            Ok(path)
        } else {
            Err(SchemaError::unavailable(identifier, "no such file"))
        }
    }

    fn resolve_remote(&self, url: &str) -> Result<PathBuf, SchemaError> {
        if let Some(path) = self.cache.lookup(url) {
            tracing::debug!(url, path = %path.display(), "schema served from cache");
            return Ok(path);
        }
        let body = match self.fetcher.fetch(url) {
            Ok(body) => body,
            Err(error) => match url.strip_prefix("http://") {
                Some(rest) => {
                    let secure = format!("https://{rest}");
                    tracing::warn!(url, %error, retry = %secure, "schema download failed, retrying over https");
                    self.fetcher
                        .fetch(&secure)
                        .map_err(|e| SchemaError::unavailable(url, e))?
                }
                None => return Err(SchemaError::unavailable(url, error)),
            },
        };
        self.cache.store(url, &body)
    }

    /// Resolve the schema declared by a document's `xsi:schemaLocation`.
    ///
    /// Relative declarations are looked up next to the document first when
    /// `base_dir` is known. Returns `Ok(None)` when nothing is declared.
    pub fn retrieve_from_document(
        &self,
        doc: &Document,
        base_dir: Option<&Path>,
    ) -> Result<Option<PathBuf>, SchemaError> {
        let Some(identifier) = declared_schema(doc) else {
            return Ok(None);
        };
        if !is_remote(&identifier) {
            if let Some(candidate) = base_dir.map(|dir| dir.join(&identifier)) {
                if candidate.is_file() {
                    return Ok(Some(candidate));
                }
            }
        }
        self.resolve(&identifier).map(Some)
    }
}

/// First `.xsd` token of the root `schemaLocation` (or
/// `noNamespaceSchemaLocation`) attribute.
pub fn declared_schema(doc: &Document) -> Option<String> {
    let root = doc.get_root_element()?;
    let locations = root
        .get_attribute("schemaLocation")
        .or_else(|| root.get_attribute("noNamespaceSchemaLocation"))?;
    locations
        .split_whitespace()
        .find(|token| token.ends_with(".xsd"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_xml_str;

    #[test]
    fn cache_key_ignores_scheme() {
        assert_eq!(
            SchemaCache::key("http://www.loc.gov/standards/alto/v4/alto-4-2.xsd"),
            SchemaCache::key("https://www.loc.gov/standards/alto/v4/alto-4-2.xsd")
        );
        assert_eq!(
            SchemaCache::key("https://www.loc.gov/standards/alto/v4/alto-4-2.xsd"),
            sha256_hex("www.loc.gov/standards/alto/v4/alto-4-2.xsd")
        );
        assert_ne!(
            SchemaCache::key("https://a.org/x.xsd"),
            SchemaCache::key("https://a.org/y.xsd")
        );
    }

    #[test]
    fn declared_schema_picks_first_xsd_token() {
        let doc = parse_xml_str(
            r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v4#"
                xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                xsi:schemaLocation="http://www.loc.gov/standards/alto/ns-v4# http://www.loc.gov/standards/alto/v4/alto-4-2.xsd"/>"#,
        )
        .unwrap();
        assert_eq!(
            declared_schema(&doc).as_deref(),
            Some("http://www.loc.gov/standards/alto/v4/alto-4-2.xsd")
        );

        let doc = parse_xml_str("<alto/>").unwrap();
        assert_eq!(declared_schema(&doc), None);
    }

    #[test]
    fn compile_error_details_list_each_message() {
        let error = SchemaError::Compile {
            path: "a.xsd".into(),
            errors: vec!["first".into(), "second".into()],
        };
        assert_eq!(error.details(), ["first", "second"]);
        let error = SchemaError::unavailable("x.xsd", "no such file");
        assert_eq!(error.details(), ["schema `x.xsd` is unavailable: no such file"]);
    }
}
