//! Filters turn source files into the assets requested in their place.
//!
//! A [`Filter`] is assembled from an [`InputMatcher`], an optional
//! [`OutputDeriver`] and a [`Transform`]. Built-in filter types are created
//! by name through the [`FilterCatalog`] and cached by the [`FilterRegistry`].

mod coffee;
mod diagnostic;
mod external;
mod registry;
mod sass;

pub use coffee::{CoffeeScriptCompiler, CoffeeScriptOptions};
pub use diagnostic::{SourceLocation, ToolDiagnostic};
pub use external::{ExternalCommand, ExternalOptions};
pub use registry::{FilterCatalog, FilterContext, FilterFactory, FilterRegistry};
pub use sass::{SassCompiler, SassOptions, STATIC_URL_ENV};

use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::command::CommandError;
use crate::finder::Finder;
use crate::matcher::{
    ExtensionMatcher, FixedPath, GlobMatcher, InputMatcher, ListMatcher, OutputDeriver,
};
use crate::types::ConfigError;

/// Error raised when a filter fails to transform its input
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Sass error: {0}")]
    Sass(ToolDiagnostic),

    #[error("CoffeeScript error: {0}")]
    CoffeeScript(ToolDiagnostic),

    #[error("Filter '{filter}' failed: {diagnostic}")]
    Command { filter: String, diagnostic: ToolDiagnostic },

    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FilterError {
    /// Map a failed command onto a tool-specific error
    pub fn from_command(
        err: CommandError,
        wrap: impl FnOnce(ToolDiagnostic) -> FilterError,
    ) -> Self {
        match err {
            CommandError::Spawn { program, source } => FilterError::Spawn { program, source },
            CommandError::Failed { stderr, .. } => wrap(ToolDiagnostic::parse(&stderr)),
        }
    }

    /// The tool's diagnostic output, if the tool ran and failed
    pub fn diagnostic(&self) -> Option<&ToolDiagnostic> {
        match self {
            FilterError::Sass(d) | FilterError::CoffeeScript(d) => Some(d),
            FilterError::Command { diagnostic, .. } => Some(diagnostic),
            FilterError::Spawn { .. } | FilterError::Io(_) => None,
        }
    }
}

/// Content transformation run by a filter
pub trait Transform: Send + Sync {
    /// Transform the file at the absolute path `input`
    fn transform(&self, input: &Path) -> Result<Vec<u8>, FilterError>;
}

/// One input to output transformation rule.
///
/// Filters are built once and never mutated, so a single instance can be
/// shared by every lookup.
pub struct Filter {
    name: String,
    input: InputMatcher,
    output: Option<OutputDeriver>,
    skip_partials: bool,
    transform: Box<dyn Transform>,
}

impl Filter {
    pub fn new(
        name: impl Into<String>,
        input: InputMatcher,
        output: Option<OutputDeriver>,
        transform: impl Transform + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            skip_partials: false,
            transform: Box::new(transform),
        }
    }

    /// Treat `_`-prefixed outputs as dependencies rather than targets
    pub fn skip_partials(mut self, skip: bool) -> Self {
        self.skip_partials = skip;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches_input(&self, path: &str) -> bool {
        self.input.matches(path)
    }

    pub fn matches_output(&self, path: &str) -> bool {
        self.output.as_ref().is_some_and(|o| o.matches(path))
    }

    /// Paths that this filter would turn into `output_path`, in probe order
    pub fn possible_input_paths(&self, output_path: &str) -> io::Result<Vec<String>> {
        self.input.derive(output_path)
    }

    /// The output produced from `input_path`, if the filter defines one
    pub fn output_path(&self, input_path: &str) -> Option<String> {
        self.output.as_ref().and_then(|o| o.derive(input_path))
    }

    /// Whether `output_path` is a dependency that must not be collected
    pub fn skip_output_path(&self, output_path: &str) -> bool {
        self.skip_partials && is_partial(output_path)
    }

    /// Transform the file at the absolute path `input`
    pub fn filter(&self, input: &Path) -> Result<Vec<u8>, FilterError> {
        self.transform.transform(input)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("skip_partials", &self.skip_partials)
            .finish_non_exhaustive()
    }
}

fn is_partial(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|name| name.starts_with('_'))
}

/// Explicit input paths: a string is a glob, an array an explicit list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputPaths {
    Glob(String),
    List(Vec<String>),
}

/// Matching options shared by every built-in filter type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub input_ext: Option<String>,
    pub input_exts: Option<Vec<String>>,
    pub output_ext: Option<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub input_paths: Option<InputPaths>,
}

impl MatchOptions {
    /// Build the matchers, falling back to the filter type's extensions.
    ///
    /// A fixed `input_path` wins over `input_paths`, which wins over
    /// extensions. A fixed `output_path` wins over the output extension.
    pub fn build(
        &self,
        default_input_exts: &[&str],
        default_output_ext: Option<&str>,
        finder: &Arc<dyn Finder>,
    ) -> Result<(InputMatcher, Option<OutputDeriver>), ConfigError> {
        let input_exts: Vec<String> = match (&self.input_exts, &self.input_ext) {
            (Some(exts), _) => exts.clone(),
            (None, Some(ext)) => vec![ext.clone()],
            (None, None) => default_input_exts.iter().map(|e| (*e).to_string()).collect(),
        };
        let output_ext = self.output_ext.as_deref().or(default_output_ext);
        let extensions = ExtensionMatcher::new(input_exts, output_ext);

        let input = match (&self.input_path, &self.input_paths) {
            (Some(path), _) => InputMatcher::Fixed(FixedPath::new(path.clone())),
            (None, Some(InputPaths::Glob(pattern))) => {
                InputMatcher::Glob(GlobMatcher::new(pattern, Arc::clone(finder))?)
            }
            (None, Some(InputPaths::List(paths))) => {
                InputMatcher::List(ListMatcher::new(paths.clone()))
            }
            (None, None) => InputMatcher::Extension(extensions.clone()),
        };

        let output = match &self.output_path {
            Some(path) => Some(OutputDeriver::Fixed(FixedPath::new(path.clone()))),
            None => {
                extensions.output_ext().is_some().then_some(OutputDeriver::Extension(extensions))
            }
        };

        Ok((input, output))
    }
}

/// Deserialize a filter's typed options from its raw option object
pub fn parse_options<T>(name: &str, options: serde_json::Value) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(options)
        .map_err(|source| ConfigError::InvalidOptions { filter: name.to_string(), source })
}
