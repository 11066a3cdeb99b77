//! The external Go toolchain
//!
//! Located once at startup and injected wherever `go` has to be run.

use crate::error::{GoptError, GoptResult};
use crate::install::InstallOperation;
use crate::resolver::VersionInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Operations gopt delegates to the `go` command
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// `go list -m -json <module>@latest`
    async fn list_latest(&self, module: &str) -> GoptResult<VersionInfo>;

    /// `go install ...` as described by `op`, output passed through
    async fn install(&self, op: &InstallOperation) -> GoptResult<()>;

    /// Human-readable location of the toolchain
    fn describe(&self) -> String;
}

/// The `go` binary on this machine
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: PathBuf,
}

impl GoToolchain {
    /// Use an explicit binary
    pub fn new(go: impl Into<PathBuf>) -> Self {
        Self { go: go.into() }
    }

    /// Find `go`: explicit path, then `PATH`, then `$GOROOT/bin`
    pub fn discover(explicit: Option<&Path>) -> GoptResult<Self> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Self::new(path));
            }
            return Err(GoptError::GoNotFound);
        }

        if let Ok(path) = which::which("go") {
            debug!("Using go from PATH: {}", path.display());
            return Ok(Self::new(path));
        }

        if let Some(goroot) = std::env::var_os("GOROOT") {
            let candidate = PathBuf::from(goroot)
                .join("bin")
                .join(format!("go{}", std::env::consts::EXE_SUFFIX));
            if candidate.is_file() {
                debug!("Using go from GOROOT: {}", candidate.display());
                return Ok(Self::new(candidate));
            }
        }

        Err(GoptError::GoNotFound)
    }

    /// Path of the `go` binary
    pub fn path(&self) -> &Path {
        &self.go
    }

    /// `go env GOVERSION`
    pub async fn version(&self) -> GoptResult<String> {
        let output = Command::new(&self.go)
            .args(["env", "GOVERSION"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GoptError::command_failed("go env GOVERSION", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GoptError::command_exec("go env GOVERSION", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Toolchain for GoToolchain {
    async fn list_latest(&self, module: &str) -> GoptResult<VersionInfo> {
        let target = format!("{}@latest", module);
        let command = format!("go list -m -json {}", target);
        debug!("Executing: {}", command);

        let output = Command::new(&self.go)
            .args(["list", "-m", "-json", &target])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GoptError::command_failed(command.clone(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GoptError::command_exec(command, stderr.trim()));
        }

        VersionInfo::from_json(module, &output.stdout)
    }

    async fn install(&self, op: &InstallOperation) -> GoptResult<()> {
        info!("Executing: {}", op.command_line());

        let status = Command::new(&self.go)
            .args(&op.build_args)
            .envs(&op.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| GoptError::command_failed(op.command_line(), e))?;

        if status.success() {
            Ok(())
        } else {
            let reason = match status.code() {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            Err(GoptError::BuildFailed {
                package: op.package.clone(),
                reason,
            })
        }
    }

    fn describe(&self) -> String {
        self.go.display().to_string()
    }
}
