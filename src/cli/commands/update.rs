//! Update command - rebuild outdated binaries

use super::scanner_for;
use crate::cli::args::UpdateArgs;
use crate::config::Config;
use crate::error::GoptResult;
use crate::factory::create_services;
use crate::ui::{self, UiContext};
use crate::update::{UpdateDecision, UpdatePlanner, UpdateReport};
use std::time::Duration;

/// Execute the update command
pub async fn execute(args: UpdateArgs, config: &Config, no_cache: bool) -> GoptResult<()> {
    let ctx = UiContext::detect();
    let scanner = scanner_for(args.dirs, config);
    let services = create_services(config, no_cache).await?;

    let timeout = Duration::from_secs(args.timeout.unwrap_or(config.update.timeout_secs));
    let observer_ctx = ctx.clone();
    let planner = UpdatePlanner::new(services.resolver, services.installer, timeout)
        .with_target(args.name)
        .with_dry_run(args.dry_run)
        .with_observer(move |provenance, decision| {
            let path = provenance.source_path.display();
            match decision {
                UpdateDecision::SkipDevel => ui::remark(
                    &observer_ctx,
                    &format!("{} is a development build, skipped", path),
                ),
                UpdateDecision::SkipUpToDate { latest } => {
                    ui::step_ok_detail(&observer_ctx, &path.to_string(), latest)
                }
                UpdateDecision::Proceed { latest } => ui::step_info(
                    &observer_ctx,
                    &format!("{} {} -> {}", path, provenance.version, latest.version),
                ),
                UpdateDecision::SkipNameMismatch => {}
            }
        });

    let report = planner.run(&scanner).await?;
    summarize(&ctx, &report, args.dry_run)
}

fn summarize(ctx: &UiContext, report: &UpdateReport, dry_run: bool) -> GoptResult<()> {
    for failure in &report.failures {
        ui::step_error_detail(
            ctx,
            &failure.path.display().to_string(),
            &failure.error.to_string(),
        );
    }

    if dry_run {
        for pending in &report.pending {
            ui::step_info(
                ctx,
                &format!("would update {} {} -> {}", pending.package, pending.from, pending.to),
            );
        }
    }

    let message = format!(
        "{} updated, {} up to date, {} devel, {} failed",
        report.updated.len(),
        report.up_to_date,
        report.devel,
        report.failures.len()
    );
    if report.has_failures() {
        ui::outro_warn(ctx, &message);
    } else {
        ui::outro_success(ctx, &message);
    }

    if report.matched == 0 {
        ui::remark(ctx, "No Go binaries found");
    }
    Ok(())
}
