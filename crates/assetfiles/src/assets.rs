//! Maps requested output paths to the source files that produce them.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::filter::{Filter, FilterError, FilterRegistry};
use crate::finder::Finder;
use crate::types::AssetfilesError;

/// A source file and the filter that turns it into the requested asset
#[derive(Debug, Clone)]
pub struct Resolution {
    pub input_path: PathBuf,
    pub filter: Arc<Filter>,
}

impl Resolution {
    /// Run the filter over the resolved input
    pub fn process(&self) -> Result<Vec<u8>, FilterError> {
        self.filter.filter(&self.input_path)
    }
}

/// Resolves virtual output paths against the filter registry and finder.
///
/// Nothing is cached: every call probes the filesystem again.
#[derive(Clone)]
pub struct AssetResolver {
    registry: Arc<FilterRegistry>,
    finder: Arc<dyn Finder>,
}

impl AssetResolver {
    pub fn new(registry: Arc<FilterRegistry>, finder: Arc<dyn Finder>) -> Self {
        Self { registry, finder }
    }

    /// Find the input and filter producing `output_path`.
    ///
    /// Returns `None` when no filter produces the path, or when none of the
    /// filter's candidate inputs exists on any root.
    pub fn resolve(&self, output_path: &str) -> Result<Option<Resolution>, AssetfilesError> {
        let Some(filter) = self.registry.find_by_output_path(output_path)? else {
            debug!(output_path, "no filter produces path");
            return Ok(None);
        };

        for candidate in filter.possible_input_paths(output_path)? {
            debug!(output_path, candidate = %candidate, filter = filter.name(), "probing");
            if let Some(input_path) = self.finder.find(&candidate)? {
                debug!(output_path, input = %input_path.display(), "resolved");
                return Ok(Some(Resolution { input_path, filter }));
            }
        }

        debug!(output_path, filter = filter.name(), "no candidate input exists");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterCatalog, FilterContext};
    use crate::finder::{FileSystemFinder, StaticFile};
    use crate::types::StaticRoot;
    use serde_json::json;
    use std::fs;
    use std::io;
    use tempfile::{TempDir, tempdir};

    fn resolver(dir: &TempDir, options: serde_json::Value) -> AssetResolver {
        let finder = FileSystemFinder::new(vec![
            StaticRoot::new(dir.path().join("static")),
            StaticRoot::new(dir.path().join("app-1/static")),
        ]);
        resolver_with(Arc::new(finder), options)
    }

    fn resolver_with(finder: Arc<dyn Finder>, options: serde_json::Value) -> AssetResolver {
        let context = FilterContext {
            finder: Arc::clone(&finder),
            static_url: "/static/".into(),
            include_dirs: Vec::new(),
        };
        let options: rustc_hash::FxHashMap<String, serde_json::Value> =
            serde_json::from_value(options).unwrap();
        let identifiers = options.keys().cloned().collect();
        let registry =
            FilterRegistry::new(identifiers, options, FilterCatalog::with_builtins(), context);
        AssetResolver::new(Arc::new(registry), finder)
    }

    /// Finder whose every lookup fails with `kind`
    struct FailingFinder(io::ErrorKind);

    impl Finder for FailingFinder {
        fn find(&self, _path: &str) -> io::Result<Option<PathBuf>> {
            Err(io::Error::from(self.0))
        }

        fn find_all(&self, _path: &str) -> io::Result<Vec<PathBuf>> {
            Err(io::Error::from(self.0))
        }

        fn roots(&self) -> &[StaticRoot] {
            &[]
        }

        fn list(&self) -> io::Result<Vec<StaticFile>> {
            Err(io::Error::from(self.0))
        }
    }

    fn touch(dir: &TempDir, path: &str) {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn cat_filter() -> serde_json::Value {
        json!({
            "cat": {
                "type": "command",
                "command": ["cat"],
                "input_exts": ["foo", "baz"],
                "output_ext": "bar",
            }
        })
    }

    #[test]
    fn test_resolves_existing_input() {
        let dir = tempdir().unwrap();
        touch(&dir, "app-1/static/main.foo");

        let resolution = resolver(&dir, cat_filter()).resolve("main.bar").unwrap().unwrap();
        assert_eq!(resolution.input_path, dir.path().join("app-1/static/main.foo"));
        assert_eq!(resolution.filter.name(), "cat");
    }

    #[test]
    fn test_candidate_order_beats_root_order() {
        let dir = tempdir().unwrap();
        touch(&dir, "static/main.baz");
        touch(&dir, "app-1/static/main.bar.foo");

        // `main.bar.foo` is the first candidate, even though it lives in a later root
        let resolution = resolver(&dir, cat_filter()).resolve("main.bar").unwrap().unwrap();
        assert_eq!(resolution.input_path, dir.path().join("app-1/static/main.bar.foo"));
    }

    #[test]
    fn test_matching_filter_without_input() {
        let dir = tempdir().unwrap();
        touch(&dir, "static/other.foo");

        assert!(resolver(&dir, cat_filter()).resolve("main.bar").unwrap().is_none());
    }

    #[test]
    fn test_no_matching_filter() {
        let dir = tempdir().unwrap();
        touch(&dir, "static/main.foo");

        assert!(resolver(&dir, cat_filter()).resolve("main.css").unwrap().is_none());
    }

    #[test]
    fn test_finder_error_propagates() {
        let finder = Arc::new(FailingFinder(io::ErrorKind::PermissionDenied));
        let resolver = resolver_with(finder, cat_filter());

        let err = resolver.resolve("main.bar").unwrap_err();
        assert!(
            matches!(&err, AssetfilesError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied),
            "unexpected error: {err:?}"
        );
        // paths no filter produces never reach the finder
        assert!(resolver.resolve("main.css").unwrap().is_none());
    }

    #[test]
    fn test_list_input_resolves_first_existing() {
        let dir = tempdir().unwrap();
        touch(&dir, "static/dir/file2.in");
        let options = json!({
            "bundle": {
                "type": "command",
                "command": ["cat"],
                "input_paths": ["dir/file1.in", "dir/file2.in"],
                "output_path": "bundle.out",
            }
        });

        let resolution = resolver(&dir, options).resolve("bundle.out").unwrap().unwrap();
        assert_eq!(resolution.input_path, dir.path().join("static/dir/file2.in"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runs_filter() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static")).unwrap();
        fs::write(dir.path().join("static/main.foo"), "content").unwrap();

        let resolution = resolver(&dir, cat_filter()).resolve("main.bar").unwrap().unwrap();
        assert_eq!(resolution.process().unwrap(), b"content");
    }
}
