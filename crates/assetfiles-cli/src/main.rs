use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use assetfiles::cli::{Cli, CollectArgs, Commands, FindArgs, OutputFormat, ServeArgs};
use assetfiles::reporter::{report_json, report_text};
use assetfiles::{
    Assetfiles, AssetfilesConfig, AssetfilesError, FileConfig, FileSystemStorage, Storage,
};

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            return tracing_subscriber::EnvFilter::new("error");
        }
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("info,ignore=warn,globset=warn"),
            1 => tracing_subscriber::EnvFilter::new("debug,ignore=warn,globset=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file named on the command line, or the default one in `cwd`
fn load_config(cli: &Cli, cwd: &Path) -> Result<AssetfilesConfig, AssetfilesError> {
    let path = match &cli.config {
        Some(path) => Some(cwd.join(path)),
        None => FileConfig::find_default(cwd),
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            Ok(AssetfilesConfig::from_file_config(cwd, FileConfig::from_path(&path)?))
        }
        None => {
            let mut config = AssetfilesConfig::default();
            config.resolve_paths(cwd);
            Ok(config)
        }
    }
}

fn collect(
    mut config: AssetfilesConfig,
    cwd: &Path,
    args: CollectArgs,
) -> Result<(), AssetfilesError> {
    // CLI args override file config
    if let Some(destination) = args.destination {
        config.destination = cwd.join(destination);
    }

    let storage: Arc<dyn Storage> = Arc::new(FileSystemStorage::new(config.destination.clone()));
    let report = Assetfiles::new(config).collect(storage, args.dry_run)?;

    match args.format {
        OutputFormat::Text => report_text(&report),
        OutputFormat::Json => report_json(&report).map_err(|e| AssetfilesError::Io(e.into()))?,
    }
    Ok(())
}

fn serve(config: AssetfilesConfig, args: ServeArgs) -> Result<(), AssetfilesError> {
    Assetfiles::new(config).dev_server().run(&args.addr)
}

fn find(config: AssetfilesConfig, args: FindArgs) -> Result<bool, AssetfilesError> {
    let assetfiles = Assetfiles::new(config);

    let mut found = assetfiles.finder().find_all(&args.path)?;
    if args.first {
        found.truncate(1);
    }
    if !found.is_empty() {
        println!("Found '{}' here:", args.path);
        for path in &found {
            println!("  {}", path.display());
        }
        return Ok(true);
    }

    match assetfiles.resolver().resolve(&args.path)? {
        Some(resolution) => {
            println!("Found '{}' via filter '{}':", args.path, resolution.filter.name());
            println!("  {}", resolution.input_path.display());
            Ok(true)
        }
        None => {
            eprintln!("No matching file found for '{}'.", args.path);
            Ok(false)
        }
    }
}

fn run(cli: Cli) -> Result<bool, AssetfilesError> {
    let cwd = cli.cwd.canonicalize()?;
    let config = load_config(&cli, &cwd)?;

    match cli.command {
        Commands::Collect(args) => collect(config, &cwd, args).map(|()| true),
        Commands::Serve(args) => serve(config, args).map(|()| true),
        Commands::Find(args) => find(config, args),
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
