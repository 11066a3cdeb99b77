//! Module proxy client (`GOPROXY` protocol, `/@latest` endpoint)

use super::VersionInfo;
use crate::error::{GoptError, GoptResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Public Go module proxy
pub const DEFAULT_PROXY: &str = "https://proxy.golang.org";

/// Remote source of the latest published version of a module
#[async_trait]
pub trait ModuleProxy: Send + Sync {
    async fn latest(&self, module: &str) -> GoptResult<VersionInfo>;
}

/// HTTP client for a `GOPROXY` server
#[derive(Debug, Clone)]
pub struct GoProxy {
    base_url: Option<String>,
    timeout: Duration,
}

impl GoProxy {
    /// Use the given proxy, or the first usable entry of `GOPROXY`
    pub fn new(explicit: Option<&str>, timeout: Duration) -> Self {
        let base_url = match explicit {
            Some(url) => Some(url.trim_end_matches('/').to_string()),
            None => proxy_from_env(std::env::var("GOPROXY").ok().as_deref()),
        };
        Self { base_url, timeout }
    }

    /// Proxy base URL, if one is configured
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn latest_url(&self, module: &str) -> Option<String> {
        self.base_url
            .as_ref()
            .map(|base| format!("{}/{}/@latest", base, escape_module_path(module)))
    }
}

#[async_trait]
impl ModuleProxy for GoProxy {
    async fn latest(&self, module: &str) -> GoptResult<VersionInfo> {
        let url = self
            .latest_url(module)
            .ok_or_else(|| GoptError::Proxy("no module proxy configured".to_string()))?;
        debug!("GET {}", url);

        let timeout = self.timeout;
        let body = tokio::task::spawn_blocking(move || fetch(&url, timeout))
            .await
            .map_err(|e| GoptError::Internal(format!("proxy request task failed: {}", e)))??;

        VersionInfo::from_json(module, body.as_bytes())
            .map_err(|e| GoptError::Proxy(e.to_string()))
    }
}

fn fetch(url: &str, timeout: Duration) -> GoptResult<String> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();

    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| GoptError::Proxy(format!("{}: {}", url, e)))?;

    response
        .body_mut()
        .read_to_string()
        .map_err(|e| GoptError::Proxy(format!("{}: {}", url, e)))
}

/// Pick the first HTTP entry from a `GOPROXY` list.
///
/// `direct` and `off` entries are skipped; an unset or empty value means the
/// public proxy.
pub fn proxy_from_env(goproxy: Option<&str>) -> Option<String> {
    let value = match goproxy.map(str::trim) {
        None | Some("") => return Some(DEFAULT_PROXY.to_string()),
        Some(v) => v,
    };

    value
        .split([',', '|'])
        .map(str::trim)
        .find(|entry| entry.starts_with("https://") || entry.starts_with("http://"))
        .map(|entry| entry.trim_end_matches('/').to_string())
}

/// Case-encode a module path: every uppercase letter becomes `!` + lowercase
pub fn escape_module_path(module: &str) -> String {
    let mut escaped = String::with_capacity(module.len());
    for c in module.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_uppercase() {
        assert_eq!(
            escape_module_path("github.com/BurntSushi/toml"),
            "github.com/!burnt!sushi/toml"
        );
        assert_eq!(escape_module_path("golang.org/x/tools"), "golang.org/x/tools");
    }

    #[test]
    fn goproxy_default() {
        assert_eq!(proxy_from_env(None).as_deref(), Some(DEFAULT_PROXY));
        assert_eq!(proxy_from_env(Some("")).as_deref(), Some(DEFAULT_PROXY));
    }

    #[test]
    fn goproxy_first_http_entry() {
        assert_eq!(
            proxy_from_env(Some("https://goproxy.cn/,direct")).as_deref(),
            Some("https://goproxy.cn")
        );
        assert_eq!(
            proxy_from_env(Some("direct|https://corp.example/proxy")).as_deref(),
            Some("https://corp.example/proxy")
        );
    }

    #[test]
    fn goproxy_direct_or_off() {
        assert_eq!(proxy_from_env(Some("direct")), None);
        assert_eq!(proxy_from_env(Some("off")), None);
    }

    #[test]
    fn latest_url_layout() {
        let proxy = GoProxy::new(Some("https://proxy.example/"), Duration::from_secs(1));
        assert_eq!(
            proxy.latest_url("github.com/Masterminds/semver").as_deref(),
            Some("https://proxy.example/github.com/!masterminds/semver/@latest")
        );
    }

    #[tokio::test]
    async fn unconfigured_proxy_fails_fast() {
        let proxy = GoProxy {
            base_url: None,
            timeout: Duration::from_secs(1),
        };
        let err = proxy.latest("github.com/a/b").await.unwrap_err();
        assert!(matches!(err, GoptError::Proxy(_)));
    }
}
