use globset::{GlobBuilder, GlobMatcher as CompiledGlob};
use rustc_hash::FxHashSet;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::finder::Finder;
use crate::types::ConfigError;

/// Matches input paths against a glob pattern.
///
/// Matching a single path is shell-style: `*` also crosses `/`, so `*.in`
/// claims `dir/file.in`. Expanding the pattern into candidates walks every
/// finder root where `*` stays within one directory and `**` recurses.
#[derive(Clone)]
pub struct GlobMatcher {
    pattern: String,
    matcher: CompiledGlob,
    expander: CompiledGlob,
    finder: Arc<dyn Finder>,
}

impl GlobMatcher {
    pub fn new(pattern: &str, finder: Arc<dyn Finder>) -> Result<Self, ConfigError> {
        let compile = |literal_separator: bool| {
            GlobBuilder::new(pattern)
                .literal_separator(literal_separator)
                .build()
                .map(|glob| glob.compile_matcher())
                .map_err(|source| ConfigError::InvalidGlob { pattern: pattern.to_string(), source })
        };

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: compile(false)?,
            expander: compile(true)?,
            finder,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Expand the pattern within every root, in root order, keeping the
    /// first occurrence of each relative path
    pub fn derive(&self, _other_path: &str) -> io::Result<Vec<String>> {
        let mut seen = FxHashSet::default();
        let mut paths = Vec::new();

        for file in self.finder.list()? {
            if self.expander.is_match(&file.path) && seen.insert(file.path.clone()) {
                paths.push(file.path);
            }
        }

        Ok(paths)
    }
}

impl fmt::Debug for GlobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobMatcher").field("pattern", &self.pattern).finish_non_exhaustive()
    }
}
