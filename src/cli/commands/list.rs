//! List command - show installed Go binaries and their latest versions

use super::scanner_for;
use crate::cli::args::{ListArgs, OutputFormat, YesNo};
use crate::config::Config;
use crate::error::GoptResult;
use crate::factory::create_services;
use crate::provenance::BuildProvenance;
use crate::resolver::VersionInfo;
use crate::scan::EXE_SUFFIX;
use crate::ui::{self, UiContext};
use chrono::{DateTime, Local, Utc};
use console::style;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Concurrent version lookups
const LOOKUP_CONCURRENCY: usize = 8;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the listing
#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    path: PathBuf,
    package: String,
    module: String,
    go_version: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    installed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_time: Option<DateTime<Utc>>,
    expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ListEntry {
    fn new(provenance: BuildProvenance, latest: Option<GoptResult<VersionInfo>>) -> Self {
        let installed_at = std::fs::metadata(&provenance.source_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        let (latest, error) = match latest {
            Some(Ok(info)) => (Some(info), None),
            Some(Err(e)) => (None, Some(e.to_string())),
            None => (None, None),
        };
        let latest_time = latest.as_ref().and_then(|l| l.published_at);
        let expired = is_expired(&provenance, installed_at, latest_time);

        Self {
            name: provenance
                .source_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            package: provenance.package_path,
            module: provenance.module_path,
            go_version: provenance.go_version,
            version: provenance.version,
            path: provenance.source_path,
            installed_at,
            latest_version: latest.map(|l| l.version),
            latest_time,
            expired,
            error,
        }
    }
}

/// Released build whose latest version was published after it was installed
fn is_expired(
    provenance: &BuildProvenance,
    installed_at: Option<DateTime<Utc>>,
    latest_time: Option<DateTime<Utc>>,
) -> bool {
    match (installed_at, latest_time) {
        (Some(installed), Some(published)) => !provenance.is_devel() && published > installed,
        _ => false,
    }
}

/// `--expired` keeps expired rows and rows whose lookup failed
fn keep_for_expired(expired_only: bool, entry: &ListEntry) -> bool {
    !expired_only || entry.expired || entry.error.is_some()
}

fn dev_filter(dev: Option<YesNo>, provenance: &BuildProvenance) -> bool {
    match dev {
        Some(YesNo::Yes) => provenance.is_devel(),
        Some(YesNo::No) => !provenance.is_devel(),
        None => true,
    }
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config, no_cache: bool) -> GoptResult<()> {
    let scanner = scanner_for(args.dirs, config);
    let dev = if args.expired { Some(YesNo::No) } else { args.dev };

    let mut found = Vec::new();
    for item in scanner.scan() {
        let provenance = item?;
        if dev_filter(dev, &provenance) {
            found.push(provenance);
        }
    }

    let lookups: Vec<Option<GoptResult<VersionInfo>>> = if args.no_latest || found.is_empty() {
        found.iter().map(|_| None).collect()
    } else {
        let services = create_services(config, no_cache).await?;
        let resolver = services.resolver.as_ref();
        let timeout = args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.resolver.lookup_timeout());

        // `buffered` keeps scan order
        stream::iter(found.iter())
            .map(|p| async move { Some(resolver.latest(&p.module_path, timeout).await) })
            .buffered(LOOKUP_CONCURRENCY)
            .collect()
            .await
    };

    let entries: Vec<ListEntry> = found
        .into_iter()
        .zip(lookups)
        .map(|(provenance, latest)| ListEntry::new(provenance, latest))
        .filter(|entry| keep_for_expired(args.expired, entry))
        .collect();

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No Go binaries found");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

fn print_table(entries: &[ListEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{}",
            style(format!("{:>3} {}", i + 1, entry.path.display())).green()
        );
        ui::field("Package", &entry.package);
        ui::field("Go", &entry.go_version);
        if let Some(installed) = entry.installed_at {
            ui::field("Install Time", &local_time(installed));
        }
        ui::field("Version", style(&entry.version).cyan());

        if let Some(latest) = &entry.latest_version {
            let styled = if *latest == entry.version {
                style(latest).cyan()
            } else {
                style(latest).magenta()
            };
            ui::field("Latest Version", styled);
            if let Some(published) = entry.latest_time {
                ui::field("Latest Time", &local_time(published));
            }
        }

        if entry.expired {
            if let (Some(installed), Some(published)) = (entry.installed_at, entry.latest_time) {
                let days = (published - installed).num_minutes() as f64 / (60.0 * 24.0);
                ui::field("Expired", style(format!("{:.1} days", days)).yellow());
            }
            let name = entry.name.strip_suffix(EXE_SUFFIX).unwrap_or(&entry.name);
            ui::field("Update", style(format!("gopt update {}", name)).yellow());
        }

        if let Some(error) = &entry.error {
            ui::field("Error", style(error).red());
        }
        println!();
    }

    println!("{} binary(ies)", entries.len());
}

fn print_json(entries: &[ListEntry]) -> GoptResult<()> {
    let json = serde_json::to_string_pretty(entries)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(entries: &[ListEntry]) {
    for entry in entries {
        let latest = entry.latest_version.as_deref().unwrap_or("-");
        println!("{}\t{}\t{}", entry.path.display(), entry.version, latest);
    }
}
