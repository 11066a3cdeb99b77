//! Install command - `go install` applications by name

use super::scanner_for;
use crate::cli::args::InstallArgs;
use crate::config::{AppConfig, Config};
use crate::error::{GoptError, GoptResult};
use crate::factory::create_services;
use crate::install::BuildFlags;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Recipes available without any configuration
const BUILTIN_APPS: &[(&str, &str)] = &[
    ("dlv", "github.com/go-delve/delve/cmd/dlv"),
    ("gopls", "golang.org/x/tools/gopls"),
    ("goimports", "golang.org/x/tools/cmd/goimports"),
    ("govulncheck", "golang.org/x/vuln/cmd/govulncheck"),
    ("staticcheck", "honnef.co/go/tools/cmd/staticcheck"),
    ("golangci-lint", "github.com/golangci/golangci-lint/cmd/golangci-lint"),
];

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config, no_cache: bool) -> GoptResult<()> {
    let ctx = UiContext::detect();

    // Resolve every name before building anything
    let apps = args
        .names
        .iter()
        .map(|name| resolve_app(name, config))
        .collect::<GoptResult<Vec<_>>>()?;

    let dir = match args.dir {
        Some(dir) => dir,
        None => default_install_dir(config)?,
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| GoptError::io(format!("creating {}", dir.display()), e))?;

    let services = create_services(config, no_cache).await?;
    ui::intro(&ctx, &format!("Installing into {}", dir.display()));

    let mut failed = Vec::new();
    for app in &apps {
        let op = services
            .installer
            .plan_install(&app.path, &flags_for(app), &dir);
        ui::step_info(&ctx, &op.command_line());

        match services.installer.execute(&op).await {
            Ok(()) => ui::step_ok_detail(&ctx, &app.path, &op.target_path.display().to_string()),
            Err(e) => {
                ui::step_error_detail(&ctx, &app.path, &e.to_string());
                failed.push(app.path.clone());
            }
        }
    }

    if failed.is_empty() {
        ui::outro_success(&ctx, &format!("{} installed", apps.len()));
        Ok(())
    } else {
        Err(GoptError::Batch {
            failed: failed.len(),
            total: apps.len(),
            names: failed,
        })
    }
}

/// Configured recipe, then built-in recipe, then a literal package path
fn resolve_app(name: &str, config: &Config) -> GoptResult<AppConfig> {
    if let Some(app) = config.apps.get(name) {
        if app.path.is_empty() {
            return Err(GoptError::User(format!("app {:?} has no path configured", name)));
        }
        return Ok(app.clone());
    }

    if let Some((_, path)) = BUILTIN_APPS.iter().find(|(app, _)| *app == name) {
        return Ok(AppConfig {
            path: path.to_string(),
            ..Default::default()
        });
    }

    if name.contains('/') {
        return Ok(AppConfig {
            path: name.to_string(),
            ..Default::default()
        });
    }

    Err(GoptError::NotFound(name.to_string()))
}

fn flags_for(app: &AppConfig) -> BuildFlags {
    BuildFlags {
        tags: app.tags.clone().filter(|t| !t.is_empty()),
        trimpath: false,
        cgo_enabled: app.cgo.map(|on| if on { "1" } else { "0" }.to_string()),
    }
}

/// First scan directory
fn default_install_dir(config: &Config) -> GoptResult<PathBuf> {
    scanner_for(Vec::new(), config)
        .dirs()
        .first()
        .cloned()
        .ok_or_else(|| GoptError::User("no install directory; pass --dir or set GOBIN".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_recipe_wins() {
        let mut config = Config::default();
        config.apps.insert(
            "dlv".to_string(),
            AppConfig {
                path: "example.com/fork/dlv".to_string(),
                tags: Some("netgo".to_string()),
                cgo: Some(false),
            },
        );

        let app = resolve_app("dlv", &config).unwrap();
        assert_eq!(app.path, "example.com/fork/dlv");

        let flags = flags_for(&app);
        assert_eq!(flags.tags.as_deref(), Some("netgo"));
        assert_eq!(flags.cgo_enabled.as_deref(), Some("0"));
    }

    #[test]
    fn builtin_and_literal_paths() {
        let config = Config::default();
        assert_eq!(
            resolve_app("gopls", &config).unwrap().path,
            "golang.org/x/tools/gopls"
        );
        assert_eq!(
            resolve_app("github.com/a/b/cmd/c", &config).unwrap().path,
            "github.com/a/b/cmd/c"
        );
    }

    #[test]
    fn unknown_name_is_not_found() {
        let err = resolve_app("no-such-app", &Config::default()).unwrap_err();
        assert!(matches!(err, GoptError::NotFound(_)));
    }

    #[test]
    fn install_dir_from_config() {
        let mut config = Config::default();
        config.scan.dirs = vec![PathBuf::from("/opt/go/bin"), PathBuf::from("/usr/local/go/bin")];
        assert_eq!(default_install_dir(&config).unwrap(), PathBuf::from("/opt/go/bin"));
    }
}
