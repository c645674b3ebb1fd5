pub mod assets;
pub mod cli;
pub mod collector;
pub mod command;
pub mod filter;
pub mod finder;
pub mod matcher;
pub mod reporter;
pub mod serve;
pub mod storage;
pub mod types;

use std::sync::Arc;

pub use assets::{AssetResolver, Resolution};
pub use filter::{Filter, FilterCatalog, FilterError, FilterRegistry};
pub use finder::{FileSystemFinder, Finder};
pub use reporter::CollectReport;
pub use storage::{FileSystemStorage, MemoryStorage, Storage};
pub use types::{AssetfilesConfig, AssetfilesError, ConfigError, FileConfig, StaticRoot};

use collector::Collector;
use serve::DevServer;

/// Finder, filter registry and resolver wired from one configuration
pub struct Assetfiles {
    config: AssetfilesConfig,
    finder: Arc<dyn Finder>,
    registry: Arc<FilterRegistry>,
}

impl Assetfiles {
    pub fn new(config: AssetfilesConfig) -> Self {
        Self::with_catalog(config, FilterCatalog::with_builtins())
    }

    /// Use a catalog holding custom filter types
    pub fn with_catalog(config: AssetfilesConfig, catalog: FilterCatalog) -> Self {
        let finder: Arc<dyn Finder> = Arc::new(FileSystemFinder::new(config.roots.clone()));
        let registry = Arc::new(FilterRegistry::from_config(&config, Arc::clone(&finder), catalog));
        Self { config, finder, registry }
    }

    pub fn config(&self) -> &AssetfilesConfig {
        &self.config
    }

    pub fn finder(&self) -> &Arc<dyn Finder> {
        &self.finder
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> AssetResolver {
        AssetResolver::new(Arc::clone(&self.registry), Arc::clone(&self.finder))
    }

    /// Run the collect pass into `storage`
    pub fn collect(
        &self,
        storage: Arc<dyn Storage>,
        dry_run: bool,
    ) -> Result<CollectReport, AssetfilesError> {
        let collector = Collector::new(
            Arc::clone(&self.finder),
            Arc::clone(&self.registry),
            storage,
            &self.config.ignore,
        )?;
        collector.collect(dry_run)
    }

    pub fn dev_server(&self) -> DevServer {
        DevServer::new(Arc::clone(&self.finder), self.resolver(), self.config.static_url.clone())
    }
}

/// Collect every static file into the configured destination
///
/// # Arguments
/// * `config` - Roots, filters and destination
/// * `dry_run` - Only report what would be written
///
/// # Returns
/// * `Ok(CollectReport)` - What was processed, copied and skipped
/// * `Err(AssetfilesError)` - A misconfigured filter, a failing tool or an IO error
///
/// # Example
/// ```no_run
/// use assetfiles::{collect_static, AssetfilesConfig, StaticRoot};
///
/// let config = AssetfilesConfig {
///     roots: vec![StaticRoot::new("static"), StaticRoot::with_prefix("vendor", "vendor")],
///     ..Default::default()
/// };
///
/// let report = collect_static(config, false).unwrap();
/// println!("Processed {} files", report.processed);
/// ```
pub fn collect_static(
    config: AssetfilesConfig,
    dry_run: bool,
) -> Result<CollectReport, AssetfilesError> {
    let storage: Arc<dyn Storage> = Arc::new(FileSystemStorage::new(config.destination.clone()));
    Assetfiles::new(config).collect(storage, dry_run)
}
