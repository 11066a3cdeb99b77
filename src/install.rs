//! Rebuild and replace installed binaries
//!
//! When the installed file still has its canonical name, `go install` writes
//! straight over it. A renamed binary is built into a scratch directory
//! first and swapped in with [`atomic_replace`], which never leaves the
//! target missing or half-written.

use crate::error::{GoptError, GoptResult};
use crate::provenance::{canonical_binary_name, BuildProvenance};
use crate::scan::EXE_SUFFIX;
use crate::toolchain::Toolchain;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Default time allowed for a single `go install`
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

/// A fully planned `go install` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOperation {
    /// Package being installed
    pub package: String,
    /// Version suffix (`latest` or a concrete version)
    pub version: String,
    /// Final location of the binary
    pub target_path: PathBuf,
    /// Arguments passed to `go`
    pub build_args: Vec<String>,
    /// Environment overrides on top of the inherited environment
    pub env: BTreeMap<String, String>,
    /// `go install` writes the target itself; no scratch dir or rename
    pub use_direct_target: bool,
    /// File name `go install` produces
    pub artifact_name: String,
}

impl InstallOperation {
    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        let env: Vec<String> = self.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{} go {}", env.join(" "), self.build_args.join(" "))
            .trim()
            .to_string()
    }
}

/// Build flags needed to reproduce a binary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFlags {
    pub tags: Option<String>,
    pub trimpath: bool,
    pub cgo_enabled: Option<String>,
}

impl BuildFlags {
    /// Flags recorded in a binary's build settings
    pub fn from_provenance(provenance: &BuildProvenance) -> Self {
        Self {
            tags: provenance
                .setting("-tags")
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            trimpath: provenance.setting("-trimpath") == Some("true"),
            cgo_enabled: provenance.setting("CGO_ENABLED").map(str::to_string),
        }
    }
}

/// Runs installs one at a time
pub struct AtomicInstaller {
    toolchain: Arc<dyn Toolchain>,
    scratch_dir: PathBuf,
    timeout: Duration,
    lock: Mutex<()>,
}

impl AtomicInstaller {
    pub fn new(toolchain: Arc<dyn Toolchain>, timeout: Duration) -> Self {
        Self {
            toolchain,
            scratch_dir: default_scratch_dir(),
            timeout,
            lock: Mutex::new(()),
        }
    }

    /// Override the scratch directory used for renamed binaries
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Plan the rebuild of an installed binary at `version`
    pub fn plan_update(&self, provenance: &BuildProvenance, version: &str) -> InstallOperation {
        let target = &provenance.source_path;
        let artifact_name = format!("{}{}", provenance.canonical_binary_name(), EXE_SUFFIX);
        let use_direct_target = target
            .file_name()
            .is_some_and(|name| name.to_string_lossy() == artifact_name);

        let gobin = if use_direct_target {
            target.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            self.scratch_dir.clone()
        };

        build_operation(
            &provenance.package_path,
            version,
            &BuildFlags::from_provenance(provenance),
            target.clone(),
            &gobin,
            use_direct_target,
        )
    }

    /// Plan a fresh install of `package@latest` into `dir`
    pub fn plan_install(&self, package: &str, flags: &BuildFlags, dir: &Path) -> InstallOperation {
        let artifact_name = format!("{}{}", canonical_binary_name(package), EXE_SUFFIX);
        build_operation(
            package,
            "latest",
            flags,
            dir.join(artifact_name),
            dir,
            true,
        )
    }

    /// Rebuild an installed binary at `version` and put it in place
    pub async fn install(&self, provenance: &BuildProvenance, version: &str) -> GoptResult<()> {
        let op = self.plan_update(provenance, version);
        self.execute(&op).await
    }

    /// Run a planned operation
    pub async fn execute(&self, op: &InstallOperation) -> GoptResult<()> {
        let _guard = self.lock.lock().await;

        if !op.use_direct_target {
            debug!("Building {} in scratch dir {}", op.package, self.scratch_dir.display());
        }

        let result = tokio::time::timeout(self.timeout, self.toolchain.install(op))
            .await
            .map_err(|_| GoptError::timeout(format!("go install {}", op.package), self.timeout))
            .and_then(|r| r)
            .and_then(|()| {
                if op.use_direct_target {
                    Ok(())
                } else {
                    let artifact = self.scratch_dir.join(&op.artifact_name);
                    replace_from(&artifact, &op.target_path)
                }
            });

        if !op.use_direct_target {
            if let Err(e) = fs::remove_dir_all(&self.scratch_dir) {
                debug!("Could not clean scratch dir {}: {}", self.scratch_dir.display(), e);
            }
        }

        if result.is_ok() {
            info!("Installed {} -> {}", op.package, op.target_path.display());
        }
        result
    }
}

/// Scratch directory for this process: `<tmp>/gopt/gobin/<pid>`
pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
        .join("gopt")
        .join("gobin")
        .join(std::process::id().to_string())
}

fn build_operation(
    package: &str,
    version: &str,
    flags: &BuildFlags,
    target_path: PathBuf,
    gobin: &Path,
    use_direct_target: bool,
) -> InstallOperation {
    let mut build_args = vec!["install".to_string()];
    if let Some(tags) = &flags.tags {
        build_args.push("-tags".to_string());
        build_args.push(tags.clone());
    }
    if flags.trimpath {
        build_args.push("-trimpath".to_string());
    }
    build_args.push(format!("{}@{}", package, version));

    let mut env = BTreeMap::new();
    env.insert("GOBIN".to_string(), gobin.display().to_string());
    if let Some(cgo) = &flags.cgo_enabled {
        env.insert("CGO_ENABLED".to_string(), cgo.clone());
    }

    InstallOperation {
        package: package.to_string(),
        version: version.to_string(),
        artifact_name: format!("{}{}", canonical_binary_name(package), EXE_SUFFIX),
        target_path,
        build_args,
        env,
        use_direct_target,
    }
}

/// Move a freshly built artifact next to `target`, then swap it in
fn replace_from(artifact: &Path, target: &Path) -> GoptResult<()> {
    let staged = sibling(target, "new");
    stage(artifact, &staged).map_err(|e| GoptError::ReplaceFailed {
        target: target.to_path_buf(),
        source: e,
    })?;

    let result = atomic_replace(&staged, target);
    if result.is_err() {
        let _ = fs::remove_file(&staged);
    }
    result
}

/// Rename, falling back to copy when the scratch dir is on another filesystem
fn stage(artifact: &Path, staged: &Path) -> std::io::Result<()> {
    if fs::rename(artifact, staged).is_ok() {
        return Ok(());
    }
    if let Err(e) = fs::copy(artifact, staged) {
        // A partial copy must not outlive the failed stage
        let _ = fs::remove_file(staged);
        return Err(e);
    }
    let _ = fs::remove_file(artifact);
    Ok(())
}

/// Replace `target` with `replacement` (which must be in the same directory).
///
/// 1. `target` is renamed aside to a unique sibling
/// 2. `replacement` is renamed to `target`
/// 3. on success the aside copy is deleted (best effort)
/// 4. on failure the aside copy is renamed back and the error returned
///
/// This function never awaits, so cancellation can't interrupt it halfway.
pub fn atomic_replace(replacement: &Path, target: &Path) -> GoptResult<()> {
    let aside = sibling(target, "old");
    fs::rename(target, &aside).map_err(|e| GoptError::ReplaceFailed {
        target: target.to_path_buf(),
        source: e,
    })?;

    match fs::rename(replacement, target) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(&aside) {
                warn!("Could not remove {}: {}", aside.display(), e);
            }
            Ok(())
        }
        Err(e) => {
            if let Err(restore) = fs::rename(&aside, target) {
                error!(
                    "Rollback failed, original binary left at {}: {}",
                    aside.display(),
                    restore
                );
            }
            Err(GoptError::ReplaceFailed {
                target: target.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Unique hidden sibling of `target`: `.<name>.<kind>-<uuid>`
fn sibling(target: &Path, kind: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let unique = uuid::Uuid::new_v4().simple().to_string();
    target.with_file_name(format!(".{}.{}-{}", name, kind, unique))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::BuildProvenance;
    use crate::resolver::fakes::FakeToolchain;
    use tempfile::TempDir;

    fn provenance(path: PathBuf, package: &str, settings: &[(&str, &str)]) -> BuildProvenance {
        BuildProvenance {
            source_path: path,
            go_version: "go1.22.1".to_string(),
            package_path: package.to_string(),
            module_path: package.to_string(),
            version: "v1.0.0".to_string(),
            settings: settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn atomic_replace_success() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tool");
        let new = dir.path().join("tool.new");
        fs::write(&target, b"old bytes").unwrap();
        fs::write(&new, b"new bytes").unwrap();

        atomic_replace(&new, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new bytes");
        assert_eq!(dir_names(dir.path()), vec!["tool"]);
    }

    #[test]
    fn atomic_replace_rolls_back() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tool");
        fs::write(&target, b"original").unwrap();

        // The replacement doesn't exist, so the second rename fails
        let err = atomic_replace(&dir.path().join("missing"), &target).unwrap_err();

        assert!(matches!(err, GoptError::ReplaceFailed { .. }));
        assert_eq!(fs::read(&target).unwrap(), b"original");
        assert_eq!(dir_names(dir.path()), vec!["tool"]);
    }

    #[test]
    fn atomic_replace_missing_target_fails_first_step() {
        let dir = TempDir::new().unwrap();
        let new = dir.path().join("new");
        fs::write(&new, b"new").unwrap();

        assert!(atomic_replace(&new, &dir.path().join("tool")).is_err());
        assert_eq!(fs::read(&new).unwrap(), b"new");
    }

    #[test]
    fn plan_direct_when_name_matches() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(format!("dlv{}", EXE_SUFFIX));
        let installer = AtomicInstaller::new(Arc::new(FakeToolchain::default()), DEFAULT_INSTALL_TIMEOUT);

        let op = installer.plan_update(
            &provenance(target.clone(), "github.com/go-delve/delve/cmd/dlv", &[("-tags", "netgo"), ("CGO_ENABLED", "0")]),
            "v1.23.0",
        );

        assert!(op.use_direct_target);
        assert_eq!(op.target_path, target);
        assert_eq!(
            op.build_args,
            vec!["install", "-tags", "netgo", "github.com/go-delve/delve/cmd/dlv@v1.23.0"]
        );
        assert_eq!(op.env["GOBIN"], dir.path().display().to_string());
        assert_eq!(op.env["CGO_ENABLED"], "0");
    }

    #[test]
    fn plan_scratch_when_renamed() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");
        let installer = AtomicInstaller::new(Arc::new(FakeToolchain::default()), DEFAULT_INSTALL_TIMEOUT)
            .with_scratch_dir(&scratch);

        let op = installer.plan_update(
            &provenance(dir.path().join("debugger"), "github.com/go-delve/delve/cmd/dlv", &[("-trimpath", "true")]),
            "v1.23.0",
        );

        assert!(!op.use_direct_target);
        assert_eq!(op.env["GOBIN"], scratch.display().to_string());
        assert!(!op.env.contains_key("CGO_ENABLED"));
        assert!(op.build_args.contains(&"-trimpath".to_string()));
        assert_eq!(op.artifact_name, format!("dlv{}", EXE_SUFFIX));
    }

    #[test]
    fn plan_fresh_install() {
        let dir = TempDir::new().unwrap();
        let installer = AtomicInstaller::new(Arc::new(FakeToolchain::default()), DEFAULT_INSTALL_TIMEOUT);
        let op = installer.plan_install("golang.org/x/tools/cmd/goimports", &BuildFlags::default(), dir.path());

        assert_eq!(op.build_args, vec!["install", "golang.org/x/tools/cmd/goimports@latest"]);
        assert_eq!(op.target_path, dir.path().join(format!("goimports{}", EXE_SUFFIX)));
        assert!(op.command_line().contains("go install"));
    }

    #[tokio::test]
    async fn renamed_binary_is_replaced_from_scratch() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();
        let target = bin.join("debugger");
        fs::write(&target, b"old").unwrap();

        let toolchain = Arc::new(FakeToolchain {
            artifact: Some(b"rebuilt".to_vec()),
            ..Default::default()
        });
        let scratch = dir.path().join("scratch");
        let installer = AtomicInstaller::new(toolchain.clone(), DEFAULT_INSTALL_TIMEOUT)
            .with_scratch_dir(&scratch);

        installer
            .install(&provenance(target.clone(), "github.com/go-delve/delve/cmd/dlv", &[]), "v1.23.0")
            .await
            .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"rebuilt");
        assert_eq!(dir_names(&bin), vec!["debugger"]);
        assert!(!scratch.exists());
        assert_eq!(toolchain.installs().len(), 1);
    }

    #[tokio::test]
    async fn build_failure_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("debugger");
        fs::write(&target, b"old").unwrap();

        let installer = AtomicInstaller::new(Arc::new(FakeToolchain::default()), DEFAULT_INSTALL_TIMEOUT)
            .with_scratch_dir(dir.path().join("scratch"));

        let err = installer
            .install(&provenance(target.clone(), "github.com/go-delve/delve/cmd/dlv", &[]), "v1.23.0")
            .await
            .unwrap_err();

        assert!(matches!(err, GoptError::BuildFailed { .. }));
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn missing_artifact_is_a_replace_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("debugger");
        fs::write(&target, b"old").unwrap();

        let result = replace_from(&dir.path().join("scratch").join("dlv"), &target);

        assert!(matches!(result, Err(GoptError::ReplaceFailed { .. })));
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert_eq!(dir_names(dir.path()), vec!["debugger"]);
    }

    #[test]
    fn failed_copy_removes_partial_stage() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join(".tool.new-partial");
        fs::write(&staged, b"half a binary").unwrap();

        let result = stage(&dir.path().join("scratch").join("tool"), &staged);

        assert!(result.is_err());
        assert!(!staged.exists());
        assert!(dir_names(dir.path()).is_empty());
    }
}
