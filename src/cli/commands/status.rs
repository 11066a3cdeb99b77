//! Status command - show toolchain, scan directories and cache

use super::scanner_for;
use crate::config::{Config, ConfigManager};
use crate::error::GoptResult;
use crate::factory::cache_dir;
use crate::resolver::proxy::proxy_from_env;
use crate::toolchain::GoToolchain;
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(config: &Config, manager: &ConfigManager) -> GoptResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "gopt status");

    ui::section(&ctx, "Go toolchain");
    match GoToolchain::discover(config.install.go.as_deref()) {
        Ok(go) => {
            ui::key_value_status(&ctx, "go", &go.path().display().to_string(), true);
            match go.version().await {
                Ok(version) => ui::key_value(&ctx, "version", &version),
                Err(e) => ui::step_warn(&ctx, &format!("go env GOVERSION failed: {}", e)),
            }
        }
        Err(e) => ui::key_value_status(&ctx, "go", &e.to_string(), false),
    }

    ui::section(&ctx, "Scan directories");
    for dir in scanner_for(Vec::new(), config).dirs() {
        ui::key_value_status(
            &ctx,
            &dir.display().to_string(),
            if dir.is_dir() { "present" } else { "missing" },
            dir.is_dir(),
        );
    }

    ui::section(&ctx, "Version lookup");
    let proxy = match &config.resolver.proxy {
        Some(proxy) => Some(proxy.clone()),
        None => proxy_from_env(std::env::var("GOPROXY").ok().as_deref()),
    };
    ui::key_value(&ctx, "proxy", proxy.as_deref().unwrap_or("none (go list only)"));
    ui::key_value(&ctx, "cache", &cache_dir(config).display().to_string());
    ui::key_value(
        &ctx,
        "cache ttl",
        &format!("{}s", config.resolver.cache_ttl_secs),
    );
    ui::key_value(&ctx, "config", &manager.path().display().to_string());

    Ok(())
}
