use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use htrvx_core::schema::{FetchError, SchemaCache, SchemaFetcher, SchemaStore};

#[allow(dead_code)]
pub fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

/// Serves schema bodies from memory and records every requested URL.
#[derive(Debug, Default)]
pub struct CountingFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: RefCell<Vec<String>>,
}

#[allow(dead_code)]
impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.as_bytes().to_vec());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl SchemaFetcher for CountingFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.borrow_mut().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// A store backed by `fetcher` and a fresh cache directory.
#[allow(dead_code)]
pub fn offline_store(fetcher: CountingFetcher) -> (SchemaStore<CountingFetcher>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let cache = SchemaCache::open(dir.path()).expect("cache dir");
    (SchemaStore::with_fetcher(cache, fetcher), dir)
}
