//! Update decisions and the update batch
//!
//! Every scanned binary is evaluated independently. Per-binary failures are
//! collected in the [`UpdateReport`] and never stop the batch.

use crate::error::{GoptError, GoptResult};
use crate::install::AtomicInstaller;
use crate::provenance::BuildProvenance;
use crate::resolver::{VersionInfo, VersionResolver};
use crate::scan::{file_name_matches, Scanner};
use crate::version;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// What to do with one binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Built from a local checkout
    SkipDevel,
    /// Installed version is the latest (or newer)
    SkipUpToDate { latest: String },
    /// Not the binary the user asked for
    SkipNameMismatch,
    /// A newer version is published
    Proceed { latest: VersionInfo },
}

/// A binary that was (or in a dry run, would be) updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedBinary {
    pub path: PathBuf,
    pub package: String,
    pub from: String,
    pub to: String,
}

/// A binary that could not be evaluated or updated
#[derive(Debug)]
pub struct UpdateFailure {
    pub path: PathBuf,
    pub error: GoptError,
}

/// Outcome of an update batch
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Binaries considered (all of them, or those matching the named target)
    pub matched: usize,
    pub updated: Vec<UpdatedBinary>,
    /// Updates found during a dry run
    pub pending: Vec<UpdatedBinary>,
    pub up_to_date: usize,
    pub devel: usize,
    pub failures: Vec<UpdateFailure>,
}

impl UpdateReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

type Observer = Box<dyn Fn(&BuildProvenance, &UpdateDecision) + Send + Sync>;

/// Evaluates scanned binaries and drives their rebuilds
pub struct UpdatePlanner {
    resolver: Arc<VersionResolver>,
    installer: Arc<AtomicInstaller>,
    lookup_timeout: Duration,
    target: Option<String>,
    dry_run: bool,
    observer: Option<Observer>,
}

impl UpdatePlanner {
    pub fn new(
        resolver: Arc<VersionResolver>,
        installer: Arc<AtomicInstaller>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            installer,
            lookup_timeout,
            target: None,
            dry_run: false,
            observer: None,
        }
    }

    /// Only update the binary with this file name
    pub fn with_target(mut self, name: Option<String>) -> Self {
        self.target = name;
        self
    }

    /// Evaluate without installing anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Called with every decision before it is acted upon
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&BuildProvenance, &UpdateDecision) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Decide what to do with one binary
    pub async fn evaluate(&self, provenance: &BuildProvenance) -> GoptResult<UpdateDecision> {
        if let Some(name) = &self.target {
            if !file_name_matches(provenance, name) {
                return Ok(UpdateDecision::SkipNameMismatch);
            }
        }

        if provenance.is_devel() {
            return Ok(UpdateDecision::SkipDevel);
        }

        let latest = self
            .resolver
            .latest(&provenance.module_path, self.lookup_timeout)
            .await?;

        if version::is_newer(&latest.version, &provenance.version) {
            Ok(UpdateDecision::Proceed { latest })
        } else {
            Ok(UpdateDecision::SkipUpToDate {
                latest: latest.version,
            })
        }
    }

    /// Scan, evaluate and update every binary.
    ///
    /// With a named target, an unmatched name is [`GoptError::NotFound`] and
    /// a failed update of the target is returned as the error.
    pub async fn run(&self, scanner: &Scanner) -> GoptResult<UpdateReport> {
        let report = Mutex::new(UpdateReport::default());
        let shared = &report;
        scanner
            .run(move |provenance| self.process(provenance, shared))
            .await?;
        let mut report = report.into_inner();

        let Some(name) = &self.target else {
            return Ok(report);
        };
        if report.matched == 0 {
            return Err(GoptError::NotFound(name.clone()));
        }
        match report.failures.len() {
            0 => Ok(report),
            1 => Err(report.failures.remove(0).error),
            failed => Err(GoptError::Batch {
                failed,
                total: report.matched,
                names: report
                    .failures
                    .iter()
                    .map(|f| f.path.display().to_string())
                    .collect(),
            }),
        }
    }

    async fn process(
        &self,
        provenance: BuildProvenance,
        report: &Mutex<UpdateReport>,
    ) -> GoptResult<()> {
        let decision = match self.evaluate(&provenance).await {
            Ok(UpdateDecision::SkipNameMismatch) => return Ok(()),
            Ok(decision) => decision,
            Err(error) => {
                let mut report = report.lock().await;
                report.matched += 1;
                report.failures.push(UpdateFailure {
                    path: provenance.source_path,
                    error,
                });
                return Ok(());
            }
        };

        if let Some(observer) = &self.observer {
            observer(&provenance, &decision);
        }
        report.lock().await.matched += 1;

        match decision {
            UpdateDecision::SkipDevel => {
                debug!("{}: development build, skipped", provenance.source_path.display());
                report.lock().await.devel += 1;
            }
            UpdateDecision::SkipUpToDate { latest } => {
                debug!("{}: up to date ({})", provenance.source_path.display(), latest);
                report.lock().await.up_to_date += 1;
            }
            UpdateDecision::SkipNameMismatch => {}
            UpdateDecision::Proceed { latest } => {
                let entry = UpdatedBinary {
                    path: provenance.source_path.clone(),
                    package: provenance.package_path.clone(),
                    from: provenance.version.clone(),
                    to: latest.version.clone(),
                };

                if self.dry_run {
                    report.lock().await.pending.push(entry);
                    return Ok(());
                }

                info!(
                    "Updating {} {} -> {}",
                    entry.package, entry.from, entry.to
                );
                match self.installer.install(&provenance, &latest.version).await {
                    Ok(()) => report.lock().await.updated.push(entry),
                    Err(error) => report.lock().await.failures.push(UpdateFailure {
                        path: provenance.source_path,
                        error,
                    }),
                }
            }
        }
        Ok(())
    }
}
