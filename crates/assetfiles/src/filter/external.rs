use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;

use super::{Filter, FilterContext, FilterError, MatchOptions, Transform, parse_options};
use crate::command::Command;
use crate::types::ConfigError;

/// Placeholder replaced with the absolute input path
const INPUT_PLACEHOLDER: &str = "{input}";

/// Options of the `command` filter type
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExternalOptions {
    /// Program and arguments, stdout becomes the output
    pub command: Vec<String>,
    pub env: FxHashMap<String, String>,
    pub skip_partials: bool,
    #[serde(flatten)]
    pub matching: MatchOptions,
}

/// Runs an arbitrary program over the input file
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    name: String,
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl ExternalCommand {
    fn input_args(&self, input: &Path) -> Vec<String> {
        let input = input.display().to_string();
        if self.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            self.args.iter().map(|a| a.replace(INPUT_PLACEHOLDER, &input)).collect()
        } else {
            let mut args = self.args.clone();
            args.push(input);
            args
        }
    }
}

impl Transform for ExternalCommand {
    fn transform(&self, input: &Path) -> Result<Vec<u8>, FilterError> {
        Command::new(&self.program)
            .args(self.input_args(input))
            .envs(self.env.iter().cloned())
            .run()
            .map_err(|e| {
                FilterError::from_command(e, |diagnostic| FilterError::Command {
                    filter: self.name.clone(),
                    diagnostic,
                })
            })
    }
}

/// Create a `command` filter. Matching has no defaults, so the options
/// must name the inputs.
pub fn create(
    name: &str,
    options: serde_json::Value,
    ctx: &FilterContext,
) -> Result<Filter, ConfigError> {
    let options: ExternalOptions = parse_options(name, options)?;
    let Some((program, args)) = options.command.split_first() else {
        return Err(ConfigError::MissingOption { filter: name.to_string(), option: "command" });
    };
    let (input, output) = options.matching.build(&[], None, &ctx.finder)?;

    let mut env: Vec<(String, String)> = options.env.into_iter().collect();
    env.sort();

    let command = ExternalCommand {
        name: name.to_string(),
        program: program.clone(),
        args: args.to_vec(),
        env,
    };
    Ok(Filter::new(name, input, output, command).skip_partials(options.skip_partials))
}
