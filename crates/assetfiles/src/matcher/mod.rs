//! Path matching strategies.
//!
//! A filter claims input paths through one [`InputMatcher`] and derives
//! output paths through an optional [`OutputDeriver`]. All paths are
//! forward-slash separated and relative to a static root.

mod extension;
mod fixed;
mod glob;
mod list;

pub use extension::ExtensionMatcher;
pub use fixed::FixedPath;
pub use glob::GlobMatcher;
pub use list::ListMatcher;

use std::io;

/// Decides which inputs a filter accepts and which inputs could produce a
/// given output
#[derive(Debug, Clone)]
pub enum InputMatcher {
    Extension(ExtensionMatcher),
    Glob(GlobMatcher),
    List(ListMatcher),
    Fixed(FixedPath),
}

impl InputMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            InputMatcher::Extension(m) => m.matches_input(path),
            InputMatcher::Glob(m) => m.matches(path),
            InputMatcher::List(m) => m.matches(path),
            InputMatcher::Fixed(m) => m.matches(path),
        }
    }

    /// Candidate input paths for `output_path`, in probe order
    pub fn derive(&self, output_path: &str) -> io::Result<Vec<String>> {
        Ok(match self {
            InputMatcher::Extension(m) => m.derive_input_paths(output_path),
            InputMatcher::Glob(m) => m.derive(output_path)?,
            InputMatcher::List(m) => m.derive(output_path),
            InputMatcher::Fixed(m) => m.derive(output_path),
        })
    }
}

/// Decides which outputs a filter produces and where an input ends up
#[derive(Debug, Clone)]
pub enum OutputDeriver {
    Extension(ExtensionMatcher),
    Fixed(FixedPath),
}

impl OutputDeriver {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            OutputDeriver::Extension(m) => m.matches_output(path),
            OutputDeriver::Fixed(m) => m.matches(path),
        }
    }

    pub fn derive(&self, input_path: &str) -> Option<String> {
        match self {
            OutputDeriver::Extension(m) => m.derive_output_path(input_path),
            OutputDeriver::Fixed(m) => Some(m.path().to_string()),
        }
    }
}
