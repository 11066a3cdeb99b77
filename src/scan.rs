//! Discovery of installed Go binaries
//!
//! Walks the install directories and yields the build provenance of every
//! Go executable found. Non-executables and unreadable files are skipped.

use crate::error::{GoptError, GoptResult};
use crate::provenance::{self, BuildProvenance};
use std::env;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Platform executable suffix
pub const EXE_SUFFIX: &str = std::env::consts::EXE_SUFFIX;

/// Scanner over one or more install directories
#[derive(Debug, Clone)]
pub struct Scanner {
    dirs: Vec<PathBuf>,
}

impl Scanner {
    /// Scan the given directories, or the Go install directories when empty
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let dirs = if dirs.is_empty() { default_dirs() } else { dirs };
        Self { dirs }
    }

    /// Directories this scanner walks
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Lazily walk all directories.
    ///
    /// Yields an error only when a root directory can't be opened; that
    /// directory is abandoned and the iterator moves on to the next one.
    pub fn scan(&self) -> ScanIter {
        ScanIter {
            dirs: self.dirs.clone().into_iter(),
            current: None,
        }
    }

    /// Invoke `on_each` for every discovered binary.
    ///
    /// Callback errors are logged and the walk continues. A directory that
    /// can't be opened aborts the run.
    pub async fn run<F, Fut>(&self, mut on_each: F) -> GoptResult<()>
    where
        F: FnMut(BuildProvenance) -> Fut,
        Fut: Future<Output = GoptResult<()>>,
    {
        for item in self.scan() {
            let provenance = item?;
            let path = provenance.source_path.clone();
            if let Err(e) = on_each(provenance).await {
                warn!("{}: {}", path.display(), e);
            }
        }
        Ok(())
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Iterator returned by [`Scanner::scan`]
pub struct ScanIter {
    dirs: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, walkdir::IntoIter)>,
}

impl Iterator for ScanIter {
    type Item = GoptResult<BuildProvenance>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let dir = self.dirs.next()?;
                debug!("Scanning {}", dir.display());
                let walker = WalkDir::new(&dir).follow_links(false).into_iter();
                self.current = Some((dir, walker));
            }
            let (root, walker) = self.current.as_mut()?;

            let entry = match walker.next() {
                None => {
                    self.current = None;
                    continue;
                }
                Some(Err(e)) if e.depth() == 0 => {
                    let path = root.clone();
                    self.current = None;
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    return Some(Err(GoptError::ScanIo { path, source }));
                }
                Some(Err(e)) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            // Symlinks and directories are not candidates
            if !entry.file_type().is_file() {
                continue;
            }

            match provenance::read(entry.path()) {
                Ok(Some(provenance)) => return Some(Ok(provenance)),
                Ok(None) => {}
                Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
            }
        }
    }
}

/// Go install directories: `GOBIN`, else `$GOPATH/bin`, else `~/go/bin`
pub fn default_dirs() -> Vec<PathBuf> {
    dirs_from_env(env::var_os("GOBIN"), env::var_os("GOPATH"), dirs::home_dir())
}

fn dirs_from_env(
    gobin: Option<OsString>,
    gopath: Option<OsString>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    let non_empty = |value: &OsString| -> Vec<PathBuf> {
        env::split_paths(value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect()
    };

    if let Some(dirs) = gobin.as_ref().map(non_empty).filter(|d| !d.is_empty()) {
        return dirs;
    }
    if let Some(first) = gopath.as_ref().and_then(|v| non_empty(v).into_iter().next()) {
        return vec![first.join("bin")];
    }
    home.map(|h| vec![h.join("go").join("bin")]).unwrap_or_default()
}

/// Whether a binary's file name matches a requested name
pub fn file_name_matches(provenance: &BuildProvenance, wanted: &str) -> bool {
    let expected = format!("{}{}", wanted, EXE_SUFFIX);
    provenance
        .source_path
        .file_name()
        .is_some_and(|name| name.to_string_lossy() == expected)
}
