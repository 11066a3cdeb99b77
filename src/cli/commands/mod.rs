//! CLI command implementations

pub mod cache;
pub mod config;
pub mod install;
pub mod list;
pub mod status;
pub mod update;

pub use cache::execute as cache;
pub use config::execute as config;
pub use install::execute as install;
pub use list::execute as list;
pub use status::execute as status;
pub use update::execute as update;

use crate::config::Config;
use crate::scan::Scanner;
use std::path::PathBuf;

/// Scanner for `--dir` arguments, else `scan.dirs`, else the Go defaults
pub(crate) fn scanner_for(dirs: Vec<PathBuf>, config: &Config) -> Scanner {
    if dirs.is_empty() {
        Scanner::new(config.scan.dirs.clone())
    } else {
        Scanner::new(dirs)
    }
}
