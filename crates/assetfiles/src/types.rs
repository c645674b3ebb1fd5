use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::FilterError;

/// Filters enabled when the configuration does not list any
pub const DEFAULT_FILTERS: &[&str] = &["sass", "coffee"];

/// Directories, relative to each static root, added to compiler search paths
pub const DEFAULT_INCLUDE_DIRS: &[&str] = &["css"];

/// Patterns excluded from the collect listing
pub const DEFAULT_IGNORE: &[&str] = &[".*", "CVS", "*~"];

pub const DEFAULT_STATIC_URL: &str = "/static/";
pub const DEFAULT_DESTINATION: &str = "public";
pub const DEFAULT_ROOT: &str = "static";

/// Config file names looked up in the working directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["assetfiles.json", "assetfiles.jsonc"];

/// A directory searched for static files.
///
/// A root with a prefix only answers paths below `<prefix>/`, so
/// `prefix/css/app.css` maps to `<path>/css/app.css`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoot {
    pub path: PathBuf,
    pub prefix: Option<String>,
}

impl StaticRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), prefix: None }
    }

    pub fn with_prefix(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        Self { path: path.into(), prefix: (!prefix.is_empty()).then_some(prefix) }
    }
}

/// Runtime configuration, after defaults and CLI overrides are applied
#[derive(Debug, Clone)]
pub struct AssetfilesConfig {
    /// Search roots in priority order
    pub roots: Vec<StaticRoot>,

    /// Filter identifiers in match priority order
    pub filters: Vec<String>,

    /// Options per filter identifier
    pub filter_options: FxHashMap<String, serde_json::Value>,

    /// Directories (relative to each root) added to compiler search paths
    pub include_dirs: Vec<String>,

    /// URL prefix assets are served under
    pub static_url: String,

    /// Where `collect` writes its output
    pub destination: PathBuf,

    /// Patterns excluded from collection
    pub ignore: Vec<String>,
}

impl Default for AssetfilesConfig {
    fn default() -> Self {
        Self {
            roots: vec![StaticRoot::new(DEFAULT_ROOT)],
            filters: DEFAULT_FILTERS.iter().map(|s| (*s).to_string()).collect(),
            filter_options: FxHashMap::default(),
            include_dirs: DEFAULT_INCLUDE_DIRS.iter().map(|s| (*s).to_string()).collect(),
            static_url: DEFAULT_STATIC_URL.to_string(),
            destination: PathBuf::from(DEFAULT_DESTINATION),
            ignore: DEFAULT_IGNORE.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl AssetfilesConfig {
    /// Build a config from a parsed file, resolving relative paths against `cwd`
    pub fn from_file_config(cwd: &Path, file: FileConfig) -> Self {
        let defaults = Self::default();

        let roots = match file.roots {
            Some(roots) if !roots.is_empty() => {
                roots.into_iter().map(RootEntry::into_root).collect()
            }
            _ => defaults.roots,
        };

        let mut config = Self {
            roots,
            filters: file.filters.unwrap_or(defaults.filters),
            filter_options: file.filter_options,
            include_dirs: file.include_dirs.unwrap_or(defaults.include_dirs),
            static_url: file.static_url.unwrap_or(defaults.static_url),
            destination: file.destination.unwrap_or(defaults.destination),
            ignore: file.ignore.unwrap_or(defaults.ignore),
        };
        config.resolve_paths(cwd);
        config
    }

    /// Make root and destination paths absolute relative to `cwd`
    pub fn resolve_paths(&mut self, cwd: &Path) {
        for root in &mut self.roots {
            if root.path.is_relative() {
                root.path = cwd.join(&root.path);
            }
        }
        if self.destination.is_relative() {
            self.destination = cwd.join(&self.destination);
        }
    }
}

/// Error types for configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Invalid options for filter '{filter}': {source}")]
    InvalidOptions {
        filter: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Filter '{filter}' requires the '{option}' option")]
    MissingOption { filter: String, option: &'static str },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to inspect static roots for filter '{filter}': {source}")]
    Probe {
        filter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install helper script '{}': {source}", path.display())]
    Helper {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Error types for assetfiles operations
#[derive(Error, Debug)]
pub enum AssetfilesError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// A root as written in the config file: a bare path or a path with a prefix
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RootEntry {
    Path(PathBuf),
    Prefixed { path: PathBuf, prefix: Option<String> },
}

impl RootEntry {
    fn into_root(self) -> StaticRoot {
        match self {
            RootEntry::Path(path) => StaticRoot::new(path),
            RootEntry::Prefixed { path, prefix: Some(prefix) } => {
                StaticRoot::with_prefix(path, prefix)
            }
            RootEntry::Prefixed { path, prefix: None } => StaticRoot::new(path),
        }
    }
}

/// Config file structure for assetfiles.json / assetfiles.jsonc
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub roots: Option<Vec<RootEntry>>,

    #[serde(default)]
    pub filters: Option<Vec<String>>,

    #[serde(default)]
    pub filter_options: FxHashMap<String, serde_json::Value>,

    #[serde(default)]
    pub include_dirs: Option<Vec<String>>,

    #[serde(default)]
    pub static_url: Option<String>,

    #[serde(default)]
    pub destination: Option<PathBuf>,

    #[serde(default)]
    pub ignore: Option<Vec<String>>,
}

impl FileConfig {
    /// Load a config file, supporting .json and .jsonc
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        json_strip_comments::strip(&mut content)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })?;
        serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })
    }

    /// Find the default config file in a directory
    pub fn find_default(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
    }
}
