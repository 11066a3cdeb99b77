//! Latest-version resolution for Go modules
//!
//! Lookup order:
//!
//! 1. The persistent cache (no network, no subprocess)
//! 2. The module proxy; successful answers are cached for an hour
//! 3. A negative cache entry for the module's domain short-circuits with
//!    an "unreachable" error
//! 4. `go list -m -json <module>@latest`; failures record a negative entry
//!    for the domain, successes are returned but never cached

pub mod fingerprint;
pub mod proxy;

pub use proxy::{GoProxy, ModuleProxy};

use crate::cache::VersionCache;
use crate::error::{GoptError, GoptResult};
use crate::toolchain::Toolchain;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default lifetime of positive and negative cache entries
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Latest published version of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "Time", default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl VersionInfo {
    /// Parse the JSON answer of the proxy or `go list -m -json`
    pub fn from_json(module: &str, raw: &[u8]) -> GoptResult<Self> {
        let info: VersionInfo = serde_json::from_slice(raw).map_err(|e| {
            GoptError::lookup(
                module,
                format!("invalid response {:?}: {}", String::from_utf8_lossy(raw), e),
            )
        })?;
        if info.version.is_empty() {
            return Err(GoptError::lookup(
                module,
                format!("invalid response {:?}", String::from_utf8_lossy(raw)),
            ));
        }
        Ok(info)
    }
}

/// Resolves the latest version of a module
pub struct VersionResolver {
    cache: Arc<dyn VersionCache>,
    proxy: Arc<dyn ModuleProxy>,
    toolchain: Arc<dyn Toolchain>,
    fingerprint: String,
    ttl: Duration,
}

impl VersionResolver {
    pub fn new(
        cache: Arc<dyn VersionCache>,
        proxy: Arc<dyn ModuleProxy>,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        Self {
            cache,
            proxy,
            toolchain,
            fingerprint: fingerprint::network_fingerprint(),
            ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS as i64),
        }
    }

    /// Override the cache entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the network fingerprint used in negative cache keys
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Resolve the latest version of `module`, giving up after `timeout`
    pub async fn latest(&self, module: &str, timeout: std::time::Duration) -> GoptResult<VersionInfo> {
        let domain = module_domain(module)?;
        tokio::time::timeout(timeout, self.resolve(module, domain))
            .await
            .map_err(|_| GoptError::timeout(format!("looking up {}", module), timeout))?
    }

    async fn resolve(&self, module: &str, domain: &str) -> GoptResult<VersionInfo> {
        if let Some(info) = self.cached(module).await {
            return Ok(info);
        }

        let proxy_err = match self.proxy.latest(module).await {
            Ok(info) => {
                self.store(module, &info).await;
                return Ok(info);
            }
            Err(e) => e,
        };
        debug!("Proxy lookup for {} failed: {}", module, proxy_err);

        let err_key = self.negative_key(domain);
        if self.cache.has(&err_key).await.unwrap_or(false) {
            return Err(GoptError::Unreachable {
                domain: domain.to_string(),
            });
        }

        match self.toolchain.list_latest(module).await {
            Ok(info) => Ok(info),
            Err(e) => {
                let reason = e.to_string();
                if let Err(cache_err) = self
                    .cache
                    .set(&err_key, serde_json::Value::String(reason.clone()), self.ttl)
                    .await
                {
                    warn!("Failed to record lookup failure for {}: {}", domain, cache_err);
                }
                Err(GoptError::lookup(
                    module,
                    format!("{}; fallback: {}", proxy_err, reason),
                ))
            }
        }
    }

    async fn cached(&self, module: &str) -> Option<VersionInfo> {
        let value = match self.cache.get(module).await {
            Ok(value) => value?,
            Err(e) => {
                warn!("Version cache read failed for {}: {}", module, e);
                return None;
            }
        };
        match serde_json::from_value::<VersionInfo>(value) {
            Ok(info) if !info.version.is_empty() => Some(info),
            _ => {
                debug!("Ignoring malformed cache entry for {}", module);
                None
            }
        }
    }

    async fn store(&self, module: &str, info: &VersionInfo) {
        let value = match serde_json::to_value(info) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode version info for {}: {}", module, e);
                return;
            }
        };
        if let Err(e) = self.cache.set(module, value, self.ttl).await {
            warn!("Version cache write failed for {}: {}", module, e);
        }
    }

    fn negative_key(&self, domain: &str) -> String {
        format!("{}-err-{}", self.fingerprint, domain)
    }
}

/// Host part of a module path; must look like a domain name
pub fn module_domain(module: &str) -> GoptResult<&str> {
    let domain = module.split_once('/').map_or(module, |(d, _)| d);
    if domain.is_empty() || !domain.contains('.') {
        return Err(GoptError::InvalidModulePath {
            module: module.to_string(),
            reason: "missing dot in first path element".to_string(),
        });
    }
    Ok(domain)
}
