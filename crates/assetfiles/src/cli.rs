use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assetfiles")]
#[command(about = "Collect and serve static files, compiling Sass and CoffeeScript on the way")]
pub struct Cli {
    /// Path to config file (assetfiles.json or assetfiles.jsonc)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory
    #[arg(short = 'C', long, default_value = ".", global = true)]
    pub cwd: PathBuf,

    /// More logging, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy every static file into the destination, running filters
    Collect(CollectArgs),
    /// Serve static files over HTTP, running filters per request
    Serve(ServeArgs),
    /// Show where a static path comes from
    Find(FindArgs),
}

#[derive(Args)]
pub struct CollectArgs {
    /// Log what would be done without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Destination directory [default: public]
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: String,
}

#[derive(Args)]
pub struct FindArgs {
    /// Static path, relative to the roots
    pub path: String,

    /// Only show the first match
    #[arg(long)]
    pub first: bool,
}

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
