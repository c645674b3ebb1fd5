use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::{Filter, coffee, external, sass};
use crate::finder::Finder;
use crate::types::{AssetfilesConfig, ConfigError};

/// Builds a filter from its identifier and raw option object
pub type FilterFactory = fn(&str, serde_json::Value, &FilterContext) -> Result<Filter, ConfigError>;

/// Shared state handed to every filter factory
#[derive(Clone)]
pub struct FilterContext {
    pub finder: Arc<dyn Finder>,
    /// URL prefix exported to tools
    pub static_url: String,
    /// Directories, relative to each root, added to compiler search paths
    pub include_dirs: Vec<String>,
}

/// Option key naming the filter type when it differs from the identifier
const TYPE_KEY: &str = "type";

/// Catalog of filter factories mapped by type name
#[derive(Clone)]
pub struct FilterCatalog {
    factories: FxHashMap<String, FilterFactory>,
}

impl FilterCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self { factories: FxHashMap::default() }
    }

    /// Create a catalog holding the built-in filter types
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("sass", sass::create);
        catalog.register("coffee", coffee::create);
        catalog.register("command", external::create);
        catalog
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, factory: FilterFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<FilterFactory> {
        self.factories.get(name).copied()
    }
}

impl fmt::Debug for FilterCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("FilterCatalog").field("factories", &names).finish()
    }
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Ordered collection of configured filters.
///
/// Filters are created on first use and cached for the registry's lifetime.
/// Lookups walk the filters in configured order and stop at the first
/// match, so a misconfigured filter only errors once a lookup reaches it.
pub struct FilterRegistry {
    identifiers: Vec<String>,
    options: FxHashMap<String, serde_json::Value>,
    catalog: FilterCatalog,
    context: FilterContext,
    cache: DashMap<String, Arc<Filter>>,
}

impl FilterRegistry {
    pub fn new(
        identifiers: Vec<String>,
        options: FxHashMap<String, serde_json::Value>,
        catalog: FilterCatalog,
        context: FilterContext,
    ) -> Self {
        Self { identifiers, options, catalog, context, cache: DashMap::new() }
    }

    pub fn from_config(
        config: &AssetfilesConfig,
        finder: Arc<dyn Finder>,
        catalog: FilterCatalog,
    ) -> Self {
        let context = FilterContext {
            finder,
            static_url: config.static_url.clone(),
            include_dirs: config.include_dirs.clone(),
        };
        Self::new(config.filters.clone(), config.filter_options.clone(), catalog, context)
    }

    /// Configured identifiers, in match priority order
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Get the filter for an identifier, creating it on first use
    pub fn get_filter(&self, id: &str) -> Result<Arc<Filter>, ConfigError> {
        if let Some(filter) = self.cache.get(id) {
            return Ok(Arc::clone(filter.value()));
        }

        let filter = self
            .cache
            .entry(id.to_string())
            .or_try_insert_with(|| self.create(id).map(Arc::new))?;
        Ok(Arc::clone(filter.value()))
    }

    fn create(&self, id: &str) -> Result<Filter, ConfigError> {
        let mut options = self.options.get(id).cloned().unwrap_or_else(|| serde_json::json!({}));
        let type_name = match options.as_object_mut().and_then(|o| o.remove(TYPE_KEY)) {
            Some(serde_json::Value::String(name)) => name,
            Some(other) => {
                let message = format!("'{TYPE_KEY}' must be a string, got {other}");
                let source = <serde_json::Error as serde::de::Error>::custom(message);
                return Err(ConfigError::InvalidOptions { filter: id.to_string(), source });
            }
            None => id.to_string(),
        };

        let factory = self
            .catalog
            .get(&type_name)
            .ok_or_else(|| ConfigError::UnknownFilter(type_name.clone()))?;
        debug!(filter = id, kind = %type_name, "creating filter");
        factory(id, options, &self.context)
    }

    /// Every configured filter in order, created as the iterator advances
    pub fn filters(&self) -> impl Iterator<Item = Result<Arc<Filter>, ConfigError>> + '_ {
        self.identifiers.iter().map(|id| self.get_filter(id))
    }

    /// First filter, in configured order, that accepts `path` as input
    pub fn find_by_input_path(&self, path: &str) -> Result<Option<Arc<Filter>>, ConfigError> {
        self.find(|filter| filter.matches_input(path))
    }

    /// First filter, in configured order, that produces `path`
    pub fn find_by_output_path(&self, path: &str) -> Result<Option<Arc<Filter>>, ConfigError> {
        self.find(|filter| filter.matches_output(path))
    }

    fn find(
        &self,
        predicate: impl Fn(&Filter) -> bool,
    ) -> Result<Option<Arc<Filter>>, ConfigError> {
        for filter in self.filters() {
            let filter = filter?;
            if predicate(&filter) {
                return Ok(Some(filter));
            }
        }
        Ok(None)
    }

    /// Drop every cached filter. Only meant for tests.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::FileSystemFinder;
    use serde_json::json;

    fn registry(identifiers: &[&str], options: serde_json::Value) -> FilterRegistry {
        let finder: Arc<dyn Finder> = Arc::new(FileSystemFinder::new(Vec::new()));
        let context =
            FilterContext { finder, static_url: "/static/".into(), include_dirs: Vec::new() };
        let options = serde_json::from_value(options).unwrap();
        FilterRegistry::new(
            identifiers.iter().map(|s| (*s).to_string()).collect(),
            options,
            FilterCatalog::with_builtins(),
            context,
        )
    }

    #[test]
    fn test_first_match_wins() {
        let registry = registry(
            &["first", "second"],
            json!({
                "first": {
                    "type": "command",
                    "command": ["cat"],
                    "input_ext": "in",
                    "output_ext": "out",
                },
                "second": {
                    "type": "command",
                    "command": ["cat"],
                    "input_exts": ["in", "txt"],
                    "output_ext": "out",
                },
            }),
        );

        assert_eq!(registry.find_by_input_path("main.in").unwrap().unwrap().name(), "first");
        assert_eq!(registry.find_by_input_path("main.txt").unwrap().unwrap().name(), "second");
        assert_eq!(registry.find_by_output_path("main.out").unwrap().unwrap().name(), "first");
        assert!(registry.find_by_input_path("main.css").unwrap().is_none());
        assert!(registry.find_by_output_path("main.css").unwrap().is_none());
    }

    #[test]
    fn test_filters_are_created_once() {
        let registry = registry(&["coffee"], json!({}));
        let a = registry.get_filter("coffee").unwrap();
        let b = registry.find_by_output_path("app.js").unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        registry.clear();
        let c = registry.get_filter("coffee").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_unused_misconfigured_filter_is_silent() {
        let registry = registry(&["coffee", "missing"], json!({}));
        assert_eq!(registry.find_by_output_path("app.js").unwrap().unwrap().name(), "coffee");

        let err = registry.find_by_output_path("app.css").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFilter(ref name) if name == "missing"));
    }

    #[test]
    fn test_invalid_options_surface_on_use() {
        let registry = registry(&["command"], json!({ "command": { "input_ext": "in" } }));
        let err = registry.get_filter("command").unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption { option: "command", .. }));
        // errors are not cached
        assert!(registry.get_filter("command").is_err());
    }

    #[test]
    fn test_type_aliasing() {
        let aliased = registry(
            &["minify", "coffee"],
            json!({
                "minify": {
                    "type": "command",
                    "command": ["cat"],
                    "input_ext": "js",
                    "output_ext": "min.js",
                }
            }),
        );
        assert_eq!(aliased.identifiers(), ["minify", "coffee"]);
        let filter = aliased.find_by_input_path("app.js").unwrap().unwrap();
        assert_eq!(filter.name(), "minify");

        let bad = registry(&["x"], json!({ "x": { "type": 3 } }));
        assert!(matches!(bad.get_filter("x"), Err(ConfigError::InvalidOptions { .. })));
    }

    #[test]
    fn test_custom_factory() {
        fn upper(
            name: &str,
            options: serde_json::Value,
            ctx: &FilterContext,
        ) -> Result<Filter, ConfigError> {
            let command = json!({
                "command": ["sh", "-c", "tr a-z A-Z < \"$1\"", "sh"],
                "input_ext": "txt",
            });
            let partials = options.get("partials").is_some();
            external::create(name, command, ctx).map(|f| f.skip_partials(partials))
        }

        let finder: Arc<dyn Finder> = Arc::new(FileSystemFinder::new(Vec::new()));
        let mut catalog = FilterCatalog::new();
        catalog.register("upper", upper);
        assert!(catalog.get("sass").is_none());

        let config = AssetfilesConfig { filters: vec!["upper".into()], ..Default::default() };
        let registry = FilterRegistry::from_config(&config, finder, catalog);
        assert_eq!(registry.find_by_input_path("a.txt").unwrap().unwrap().name(), "upper");
    }
}
