use serde::Deserialize;
use std::path::Path;

use super::{Filter, FilterContext, FilterError, MatchOptions, Transform, parse_options};
use crate::command::Command;
use crate::types::ConfigError;

const INPUT_EXTS: &[&str] = &["coffee"];
const OUTPUT_EXT: &str = "js";
const DEFAULT_COFFEE_PATH: &str = "coffee";

/// Options of the `coffee` filter type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoffeeScriptOptions {
    pub coffee_path: Option<String>,
    /// Compile without the top-level function safety wrapper
    pub bare: bool,
    #[serde(flatten)]
    pub matching: MatchOptions,
}

/// Compiles CoffeeScript into JavaScript with the `coffee` binary
#[derive(Debug, Clone)]
pub struct CoffeeScriptCompiler {
    coffee_path: String,
    args: Vec<String>,
}

impl CoffeeScriptCompiler {
    pub fn new(options: &CoffeeScriptOptions) -> Self {
        let mut args = Vec::new();
        if options.bare {
            args.push("--bare".to_string());
        }
        args.extend(["--compile".to_string(), "--print".to_string()]);

        Self {
            coffee_path: options
                .coffee_path
                .clone()
                .unwrap_or_else(|| DEFAULT_COFFEE_PATH.to_string()),
            args,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Transform for CoffeeScriptCompiler {
    fn transform(&self, input: &Path) -> Result<Vec<u8>, FilterError> {
        Command::new(&self.coffee_path)
            .args(&self.args)
            .arg(input)
            .run()
            .map_err(|e| FilterError::from_command(e, FilterError::CoffeeScript))
    }
}

/// Create a `coffee` filter
pub fn create(
    name: &str,
    options: serde_json::Value,
    ctx: &FilterContext,
) -> Result<Filter, ConfigError> {
    let options: CoffeeScriptOptions = parse_options(name, options)?;
    let (input, output) = options.matching.build(INPUT_EXTS, Some(OUTPUT_EXT), &ctx.finder)?;
    Ok(Filter::new(name, input, output, CoffeeScriptCompiler::new(&options)))
}
