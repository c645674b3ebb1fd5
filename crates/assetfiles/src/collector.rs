use globset::{Glob, GlobSet, GlobSetBuilder};
use rustc_hash::FxHashSet;
use std::fs;
use std::sync::Arc;
use tracing::info;

use crate::filter::FilterRegistry;
use crate::finder::{Finder, StaticFile};
use crate::reporter::{CollectAction, CollectEntry, CollectReport, SkipReason};
use crate::storage::Storage;
use crate::types::{AssetfilesError, ConfigError};

/// Expand brace patterns like `*.{swp,bak}` into multiple patterns
fn expand_brace_pattern(pattern: &str) -> Vec<String> {
    if let Some(start) = pattern.find('{') {
        if let Some(end) = pattern[start..].find('}') {
            let end = start + end;
            let prefix = &pattern[..start];
            let suffix = &pattern[end + 1..];
            let alternatives = &pattern[start + 1..end];

            return alternatives
                .split(',')
                .flat_map(|alt| {
                    let expanded = format!("{prefix}{alt}{suffix}");
                    expand_brace_pattern(&expanded)
                })
                .collect();
        }
    }
    vec![pattern.to_string()]
}

/// Compile a list of glob patterns into a GlobSet
fn compile_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        for expanded in expand_brace_pattern(pattern) {
            builder.add(Glob::new(&expanded).map_err(invalid_glob(pattern))?);
        }
    }
    builder.build().map_err(invalid_glob(&patterns.join(",")))
}

fn invalid_glob(pattern: &str) -> impl FnOnce(globset::Error) -> ConfigError + '_ {
    move |source| ConfigError::InvalidGlob { pattern: pattern.to_string(), source }
}

/// Copies every static file into storage, running filters on the way.
///
/// Files are handled one at a time in finder order. The first filter error
/// stops the pass and leaves what was already written in place.
pub struct Collector {
    finder: Arc<dyn Finder>,
    registry: Arc<FilterRegistry>,
    storage: Arc<dyn Storage>,
    ignore: GlobSet,
}

impl Collector {
    pub fn new(
        finder: Arc<dyn Finder>,
        registry: Arc<FilterRegistry>,
        storage: Arc<dyn Storage>,
        ignore_patterns: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self { finder, registry, storage, ignore: compile_globset(ignore_patterns)? })
    }

    /// Whether the path or any of its segments matches an ignore pattern
    fn is_ignored(&self, path: &str) -> bool {
        self.ignore.is_match(path) || path.split('/').any(|segment| self.ignore.is_match(segment))
    }

    pub fn collect(&self, dry_run: bool) -> Result<CollectReport, AssetfilesError> {
        let mut report = CollectReport::new(dry_run);
        let mut collected: FxHashSet<String> = FxHashSet::default();

        for file in self.finder.list()? {
            if self.is_ignored(&file.path) {
                continue;
            }
            let entry = self.collect_file(&file, &mut collected, dry_run)?;
            report.push(entry);
        }

        Ok(report)
    }

    fn collect_file(
        &self,
        file: &StaticFile,
        collected: &mut FxHashSet<String>,
        dry_run: bool,
    ) -> Result<CollectEntry, AssetfilesError> {
        let source = file.path.clone();
        let filter = self.registry.find_by_input_path(&file.path)?;
        let output = filter
            .as_ref()
            .and_then(|f| f.output_path(&file.path).map(|target| (Arc::clone(f), target)));

        let Some((filter, target)) = output else {
            if !collected.insert(source.clone()) {
                info!("Skipping '{source}' (already copied earlier)");
                return Ok(skipped(source.clone(), source, None, SkipReason::AlreadyCollected));
            }

            info!("Copying '{source}'");
            if !dry_run {
                let content = fs::read(&file.absolute)?;
                self.write(&source, &content)?;
            }
            return Ok(CollectEntry {
                target: source.clone(),
                source,
                filter: None,
                action: CollectAction::Copied,
            });
        };

        let filter_name = Some(filter.name().to_string());
        if filter.skip_output_path(&target) {
            info!("Skipping '{source}' (partial)");
            return Ok(skipped(source, target, filter_name, SkipReason::Partial));
        }
        if !collected.insert(target.clone()) {
            info!("Skipping '{source}' (already processed earlier)");
            return Ok(skipped(source, target, filter_name, SkipReason::AlreadyCollected));
        }

        info!("Processing '{source}' -> '{target}' with {}", filter.name());
        if !dry_run {
            let content = filter.filter(&file.absolute)?;
            self.write(&target, &content)?;
        }
        Ok(CollectEntry { source, target, filter: filter_name, action: CollectAction::Processed })
    }

    fn write(&self, name: &str, content: &[u8]) -> std::io::Result<()> {
        if self.storage.exists(name)? {
            self.storage.delete(name)?;
        }
        self.storage.save(name, content)?;
        Ok(())
    }
}

fn skipped(
    source: String,
    target: String,
    filter: Option<String>,
    reason: SkipReason,
) -> CollectEntry {
    CollectEntry { source, target, filter, action: CollectAction::Skipped(reason) }
}
