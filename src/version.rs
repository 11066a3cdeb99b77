//! Module version ordering
//!
//! Go module versions are semver with a mandatory `v` prefix. Shortened forms
//! such as `v1.2` are padded, and `+incompatible` build metadata is ignored.

use semver::Version;
use std::cmp::Ordering;

/// Parse a module version, `None` if it isn't valid semver
pub fn parse(version: &str) -> Option<Version> {
    let raw = version.strip_prefix('v')?;
    let raw = raw.split_once('+').map_or(raw, |(v, _build)| v);
    let (core, pre) = match raw.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (raw, None),
    };

    let parts = core.split('.').count();
    let padded = match parts {
        1 => format!("{}.0.0", core),
        2 => format!("{}.0", core),
        _ => core.to_string(),
    };
    let full = match pre {
        Some(pre) => format!("{}-{}", padded, pre),
        None => padded,
    };

    Version::parse(&full).ok()
}

/// Semver comparison; invalid versions sort below valid ones
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// `latest` is strictly newer than `installed`
pub fn is_newer(latest: &str, installed: &str) -> bool {
    compare(latest, installed) == Ordering::Greater
}
