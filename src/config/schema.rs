//! Configuration schema for gopt
//!
//! Configuration is stored at `~/.config/gopt/config.toml`

use crate::resolver::DEFAULT_CACHE_TTL_SECS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for cache durations (100 years)
pub const MAX_CACHE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Where to look for installed binaries
    pub scan: ScanConfig,

    /// Version lookup settings
    pub resolver: ResolverConfig,

    /// Update command settings
    pub update: UpdateConfig,

    /// Install settings
    pub install: InstallConfig,

    /// Named install recipes for `gopt install <name>`
    pub apps: BTreeMap<String, AppConfig>,
}

impl Config {
    /// Reject values that cannot be represented as cache durations
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("resolver.cache_ttl_secs", self.resolver.cache_ttl_secs),
            ("resolver.gc_interval_secs", self.resolver.gc_interval_secs),
        ] {
            if value > MAX_CACHE_SECS {
                return Err(format!("{} must be at most {} (100 years)", name, MAX_CACHE_SECS));
            }
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Scan settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directories to scan; empty means GOBIN / GOPATH/bin / ~/go/bin
    pub dirs: Vec<PathBuf>,
}

/// Version resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Module proxy URL (default: first HTTP entry of GOPROXY)
    pub proxy: Option<String>,

    /// Lifetime of cached lookups in seconds
    pub cache_ttl_secs: u64,

    /// Per-module lookup timeout in seconds
    pub lookup_timeout_secs: u64,

    /// Cache directory override
    pub cache_dir: Option<PathBuf>,

    /// Minimum time between sweeps of expired cache entries
    pub gc_interval_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            lookup_timeout_secs: 5,
            cache_dir: None,
            gc_interval_secs: 3600,
        }
    }
}

impl ResolverConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        clamped_seconds(self.cache_ttl_secs)
    }

    pub fn gc_interval(&self) -> chrono::Duration {
        clamped_seconds(self.gc_interval_secs)
    }
}

fn clamped_seconds(secs: u64) -> chrono::Duration {
    // MAX_CACHE_SECS fits in i64 and in chrono's range
    chrono::Duration::seconds(secs.min(MAX_CACHE_SECS) as i64)
}

/// Update settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Version lookup timeout for `update` in seconds
    pub timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// Install settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Timeout for a single `go install` in seconds
    pub timeout_secs: u64,

    /// Explicit path to the go binary
    pub go: Option<PathBuf>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            go: None,
        }
    }
}

/// Install recipe for one application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Package path, e.g. `github.com/go-delve/delve/cmd/dlv`
    pub path: String,

    /// Build tags passed as `-tags`
    pub tags: Option<String>,

    /// `CGO_ENABLED` value
    pub cgo: Option<bool>,
}
