//! gopt - keep `go install`ed binaries up to date
//!
//! Finds Go binaries in the install directories, reads their embedded build
//! information, resolves the latest published version of each module and
//! rebuilds outdated binaries without ever leaving a half-replaced file.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod factory;
pub mod install;
pub mod provenance;
pub mod resolver;
pub mod scan;
pub mod toolchain;
pub mod ui;
pub mod update;
pub mod version;

pub use error::{GoptError, GoptResult};
