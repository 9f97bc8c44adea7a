//! Template source cache keyed by resolved path

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::RenderError;

/// Loads raw template text and keeps it for the life of the store
///
/// Entries are never refreshed from disk; [`clear`](Self::clear) is the only invalidation.
#[derive(Debug, Default)]
pub struct TemplateStore {
    root: Option<PathBuf>,
    templates: RwLock<HashMap<PathBuf, Arc<str>>>,
    reads: AtomicUsize,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that resolves relative paths against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve a template path to the absolute path used as cache key
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        let joined = match &self.root {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        };
        std::path::absolute(&joined).unwrap_or(joined)
    }

    /// Return the template text, reading the file on first use
    pub fn load(&self, path: &Path) -> Result<Arc<str>, RenderError> {
        let resolved = self.resolve_path(path);

        if let Some(text) = self.read_lock().get(&resolved) {
            trace!(path = %resolved.display(), "template cache hit");
            return Ok(Arc::clone(text));
        }

        trace!(path = %resolved.display(), "template cache miss");
        let text: Arc<str> = std::fs::read_to_string(&resolved)
            .map_err(|source| RenderError::Io {
                path: resolved.clone(),
                source,
            })?
            .into();
        self.reads.fetch_add(1, Ordering::Relaxed);

        let mut templates = self.write_lock();
        let cached = templates.entry(resolved).or_insert(text);
        Ok(Arc::clone(cached))
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    /// Number of file reads performed so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Drop every cached template
    pub fn clear(&self) {
        self.write_lock().clear();
    }

    // Poisoning is ignored: every write is a single insert or clear.
    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<str>>> {
        self.templates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Arc<str>>> {
        self.templates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_caches_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), "<p>a</p>").unwrap();
        let store = TemplateStore::with_root(dir.path());

        assert_eq!(&*store.load(Path::new("a.html")).unwrap(), "<p>a</p>");
        std::fs::write(dir.path().join("a.html"), "<p>changed</p>").unwrap();
        assert_eq!(&*store.load(Path::new("a.html")).unwrap(), "<p>a</p>");
        assert_eq!(store.reads(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_relative_and_absolute_paths_share_an_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.html");
        std::fs::write(&file, "x").unwrap();
        let store = TemplateStore::with_root(dir.path());

        store.load(Path::new("a.html")).unwrap();
        store.load(&file).unwrap();
        assert_eq!(store.reads(), 1);
    }

    #[test]
    fn test_clear_forces_reread() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), "one").unwrap();
        let store = TemplateStore::with_root(dir.path());

        store.load(Path::new("a.html")).unwrap();
        std::fs::write(dir.path().join("a.html"), "two").unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(&*store.load(Path::new("a.html")).unwrap(), "two");
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::with_root(dir.path());
        match store.load(Path::new("missing.html")) {
            Err(RenderError::Io { path, .. }) => assert!(path.ends_with("missing.html")),
            other => panic!("expected Io error, got {:?}", other),
        }
        assert!(store.is_empty());
    }
}
