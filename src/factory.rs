//! Wiring of the version cache, resolver and installer from configuration

use crate::cache::file::FileCache;
use crate::cache::memory::MemoryCache;
use crate::cache::VersionCache;
use crate::config::Config;
use crate::error::GoptResult;
use crate::install::AtomicInstaller;
use crate::resolver::{GoProxy, VersionResolver};
use crate::toolchain::GoToolchain;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared collaborators for the update and install commands
pub struct Services {
    pub toolchain: Arc<GoToolchain>,
    pub resolver: Arc<VersionResolver>,
    pub installer: Arc<AtomicInstaller>,
}

/// Directory of the persistent version cache
pub fn cache_dir(config: &Config) -> PathBuf {
    config
        .resolver
        .cache_dir
        .clone()
        .unwrap_or_else(FileCache::default_dir)
}

/// Open the file cache, sweeping it when a sweep is due
pub async fn open_file_cache(config: &Config) -> GoptResult<FileCache> {
    let cache = FileCache::open(cache_dir(config)).await?;
    match cache.sweep_if_due(config.resolver.gc_interval()).await {
        Ok(0) => {}
        Ok(n) => debug!("Swept {} expired cache entries", n),
        Err(e) => warn!("Cache sweep failed: {}", e),
    }
    Ok(cache)
}

/// Locate `go`, open the cache and build the resolver and installer
pub async fn create_services(config: &Config, no_cache: bool) -> GoptResult<Services> {
    let toolchain = Arc::new(GoToolchain::discover(config.install.go.as_deref())?);

    let cache: Arc<dyn VersionCache> = if no_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(open_file_cache(config).await?)
    };

    let proxy = Arc::new(GoProxy::new(
        config.resolver.proxy.as_deref(),
        config.resolver.lookup_timeout(),
    ));

    let resolver = Arc::new(
        VersionResolver::new(cache, proxy, toolchain.clone())
            .with_ttl(config.resolver.cache_ttl()),
    );
    let installer = Arc::new(AtomicInstaller::new(
        toolchain.clone(),
        Duration::from_secs(config.install.timeout_secs),
    ));

    Ok(Services {
        toolchain,
        resolver,
        installer,
    })
}
