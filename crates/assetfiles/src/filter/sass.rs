use serde::{Deserialize, Deserializer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::{Filter, FilterContext, FilterError, MatchOptions, Transform, parse_options};
use crate::command::{Command, option_name, push_option, push_option_array};
use crate::types::ConfigError;

/// Environment variable carrying the static URL prefix to tool helpers
pub const STATIC_URL_ENV: &str = "ASSETFILES_STATIC_URL";

const INPUT_EXTS: &[&str] = &["sass", "scss"];
const OUTPUT_EXT: &str = "css";
const DEFAULT_SASS_PATH: &str = "sass";

/// Bundler setup, required before anything else
const SASS_ENV: (&str, &str) = ("sass_env.rb", include_str!("../../scripts/sass_env.rb"));
/// `static-url()`, `image-url()`, `font-url()` and friends
const SASS_FUNCTIONS: (&str, &str) =
    ("sass_functions.rb", include_str!("../../scripts/sass_functions.rb"));

/// Options of the `sass` filter type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SassOptions {
    /// Sass binary, `sass` on `PATH` by default
    pub sass_path: Option<String>,
    /// Bundler setup script. Absent means the bundled one, `null` disables it.
    #[serde(deserialize_with = "nullable")]
    pub sass_env_path: Option<Option<PathBuf>>,
    /// Asset URL helpers. Absent means the bundled ones, `null` disables them.
    #[serde(deserialize_with = "nullable")]
    pub sass_functions_path: Option<Option<PathBuf>>,
    pub style: Option<String>,
    pub precision: Option<u32>,
    pub cache_location: Option<String>,
    pub quiet: bool,
    pub debug_info: bool,
    pub line_numbers: bool,
    pub no_cache: bool,
    /// Compass integration, detected from `PATH` when unset
    pub compass: Option<bool>,
    /// Ruby files required before compiling, after the helpers
    pub require: Vec<String>,
    /// Extra load paths, searched after the static include dirs
    pub load_paths: Vec<PathBuf>,
    #[serde(flatten)]
    pub matching: MatchOptions,
}

/// Tells an explicit `null` apart from a missing key
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Compiles Sass and SCSS files into CSS with the `sass` binary
#[derive(Debug, Clone)]
pub struct SassCompiler {
    sass_path: String,
    args: Vec<String>,
    static_url: String,
}

impl SassCompiler {
    /// `helpers` are required ahead of the configured `require` list.
    pub fn new(
        options: &SassOptions,
        helpers: &[PathBuf],
        load_paths: &[PathBuf],
        compass: bool,
        static_url: &str,
    ) -> Self {
        let mut args = Vec::new();

        push_option_array(&mut args, "require", helpers.iter().map(|p| p.display()));
        push_option_array(&mut args, "require", &options.require);
        push_option_array(&mut args, "load_path", load_paths.iter().map(|p| p.display()));

        if let Some(style) = &options.style {
            push_option(&mut args, "style", style);
        }
        if let Some(precision) = options.precision {
            push_option(&mut args, "precision", precision);
        }
        if let Some(cache_location) = &options.cache_location {
            push_option(&mut args, "cache_location", cache_location);
        }

        let flags = [
            ("quiet", options.quiet),
            ("compass", compass),
            ("debug_info", options.debug_info),
            ("line_numbers", options.line_numbers),
            ("no_cache", options.no_cache),
        ];
        args.extend(flags.iter().filter(|(_, on)| *on).map(|(name, _)| option_name(name)));

        Self {
            sass_path: options.sass_path.clone().unwrap_or_else(|| DEFAULT_SASS_PATH.to_string()),
            args,
            static_url: static_url.to_string(),
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Transform for SassCompiler {
    fn transform(&self, input: &Path) -> Result<Vec<u8>, FilterError> {
        Command::new(&self.sass_path)
            .args(&self.args)
            .arg(input)
            .env(STATIC_URL_ENV, &self.static_url)
            .run()
            .map_err(|e| FilterError::from_command(e, FilterError::Sass))
    }
}

/// Create a `sass` filter.
///
/// Load paths are every existing include dir below the static roots,
/// followed by the configured `load_paths`.
pub fn create(
    name: &str,
    options: serde_json::Value,
    ctx: &FilterContext,
) -> Result<Filter, ConfigError> {
    let options: SassOptions = parse_options(name, options)?;
    let (input, output) = options.matching.build(INPUT_EXTS, Some(OUTPUT_EXT), &ctx.finder)?;

    let mut helpers = Vec::new();
    helpers.extend(helper(&options.sass_env_path, SASS_ENV)?);
    helpers.extend(helper(&options.sass_functions_path, SASS_FUNCTIONS)?);

    let mut load_paths = Vec::new();
    for dir in &ctx.include_dirs {
        let found = ctx
            .finder
            .find_all(dir)
            .map_err(|source| ConfigError::Probe { filter: name.to_string(), source })?;
        load_paths.extend(found);
    }
    load_paths.extend(options.load_paths.iter().cloned());

    let compass = options.compass.unwrap_or_else(detect_compass);
    let compiler = SassCompiler::new(&options, &helpers, &load_paths, compass, &ctx.static_url);

    Ok(Filter::new(name, input, output, compiler).skip_partials(true))
}

/// The configured helper path, or the bundled script installed to disk
fn helper(
    configured: &Option<Option<PathBuf>>,
    (file_name, content): (&str, &str),
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = configured {
        return Ok(path.clone());
    }
    let path = helper_dir().join(file_name);
    install_helper(&path, content)
        .map_err(|source| ConfigError::Helper { path: path.clone(), source })?;
    Ok(Some(path))
}

fn helper_dir() -> PathBuf {
    std::env::temp_dir().join(concat!("assetfiles-", env!("CARGO_PKG_VERSION")))
}

/// Write `content` to `path` unless it is already there. Readers never see
/// a partly written file.
fn install_helper(path: &Path, content: &str) -> io::Result<()> {
    static NEXT: AtomicUsize = AtomicUsize::new(0);

    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let staging = path.with_extension(format!("{}.{n}.tmp", std::process::id()));
    fs::write(&staging, content)?;
    fs::rename(&staging, path)?;
    debug!(path = %path.display(), "installed sass helper");
    Ok(())
}

fn detect_compass() -> bool {
    let found = which::which("compass").is_ok();
    debug!(found, "compass detection");
    found
}
