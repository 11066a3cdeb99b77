//! Build provenance embedded in Go executables
//!
//! `go build` stamps every executable with a build info blob: the toolchain
//! version, the main package and module, and the build settings. Only the
//! inline header layout written by Go 1.18 and later is understood; older
//! executables are reported as not applicable.

use crate::error::{GoptError, GoptResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Version reported for binaries built from a local checkout
pub const DEVEL_VERSION: &str = "(devel)";

const BUILDINFO_MAGIC: &[u8] = b"\xff Go buildinf:";
const BUILDINFO_HEADER_LEN: usize = 32;
const FLAG_VERSION_INLINE: u8 = 0x2;

/// Sentinel wrapping the module info string (16 bytes on each side)
const MODINFO_SENTINEL_LEN: usize = 16;

/// Build metadata read from an executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildProvenance {
    /// File this provenance was read from
    pub source_path: PathBuf,
    /// Toolchain that produced the executable, e.g. `go1.22.1`
    pub go_version: String,
    /// Import path of the main package
    pub package_path: String,
    /// Path of the main module
    pub module_path: String,
    /// Main module version, `(devel)` for local builds
    pub version: String,
    /// Build settings in recorded order (`-tags`, `CGO_ENABLED`, ...)
    pub settings: Vec<(String, String)>,
}

impl BuildProvenance {
    /// Whether this binary was built from a local checkout
    pub fn is_devel(&self) -> bool {
        self.version == DEVEL_VERSION
    }

    /// Look up a build setting by key
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Name `go install` gives the executable of this package
    pub fn canonical_binary_name(&self) -> &str {
        canonical_binary_name(&self.package_path)
    }
}

/// Default executable name for an import path.
///
/// The last path element, unless it is a major version suffix (`/v2`), in
/// which case the element before it.
pub fn canonical_binary_name(import_path: &str) -> &str {
    let mut elems = import_path.rsplit('/');
    let last = elems.next().unwrap_or(import_path);
    if last != import_path && is_version_element(last) {
        if let Some(prev) = elems.next() {
            return prev;
        }
    }
    last
}

fn is_version_element(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'v' || bytes[1] == b'0' || (bytes[1] == b'1' && bytes.len() == 2) {
        return false;
    }
    bytes[1..].iter().all(u8::is_ascii_digit)
}

/// Read build provenance from a file.
///
/// Returns `Ok(None)` for anything that isn't a Go executable. An error is
/// only returned when the file can't be read.
pub fn read(path: &Path) -> GoptResult<Option<BuildProvenance>> {
    let mut file = File::open(path)
        .map_err(|e| GoptError::io(format!("opening {}", path.display()), e))?;

    let mut head = [0u8; 4];
    match file.read_exact(&mut head) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(GoptError::io(format!("reading {}", path.display()), e)),
    }
    if !is_executable_header(&head) {
        return Ok(None);
    }

    let mut data = head.to_vec();
    file.read_to_end(&mut data)
        .map_err(|e| GoptError::io(format!("reading {}", path.display()), e))?;

    let provenance = parse(&data, path);
    if provenance.is_none() {
        debug!("No Go build info in {}", path.display());
    }
    Ok(provenance)
}

/// ELF, Mach-O (thin and fat) and PE signatures
fn is_executable_header(head: &[u8; 4]) -> bool {
    matches!(
        head,
        [0x7f, b'E', b'L', b'F']
            | [0xfe, 0xed, 0xfa, 0xce]
            | [0xfe, 0xed, 0xfa, 0xcf]
            | [0xce, 0xfa, 0xed, 0xfe]
            | [0xcf, 0xfa, 0xed, 0xfe]
            | [0xca, 0xfe, 0xba, 0xbe]
            | [b'M', b'Z', _, _]
    )
}

/// Locate and decode the build info blob in executable bytes
pub(crate) fn parse(data: &[u8], path: &Path) -> Option<BuildProvenance> {
    let mut offset = 0;
    while let Some(pos) = find(&data[offset..], BUILDINFO_MAGIC) {
        let start = offset + pos;
        if let Some(provenance) = decode_at(&data[start..], path) {
            return Some(provenance);
        }
        offset = start + 1;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_at(blob: &[u8], path: &Path) -> Option<BuildProvenance> {
    if blob.len() < BUILDINFO_HEADER_LEN {
        return None;
    }
    let flags = blob[BUILDINFO_MAGIC.len() + 1];
    if flags & FLAG_VERSION_INLINE == 0 {
        // Pre-1.18 layout stores pointers into the data segment
        return None;
    }

    let rest = &blob[BUILDINFO_HEADER_LEN..];
    let (go_version, rest) = read_varint_string(rest)?;
    let (modinfo, _) = read_varint_string(rest)?;
    if go_version.is_empty() {
        return None;
    }

    let modinfo = strip_sentinels(modinfo);
    let text = std::str::from_utf8(modinfo).ok()?;
    let mut provenance = parse_modinfo(text, path)?;
    provenance.go_version = String::from_utf8_lossy(go_version).into_owned();
    Some(provenance)
}

fn strip_sentinels(modinfo: &[u8]) -> &[u8] {
    let len = modinfo.len();
    if len > 2 * MODINFO_SENTINEL_LEN && modinfo[len - MODINFO_SENTINEL_LEN - 1] == b'\n' {
        &modinfo[MODINFO_SENTINEL_LEN..len - MODINFO_SENTINEL_LEN]
    } else {
        modinfo
    }
}

fn read_varint_string(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, byte) in buf.iter().enumerate() {
        if shift >= 64 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            let len = usize::try_from(value).ok()?;
            let body = &buf[i + 1..];
            if body.len() < len {
                return None;
            }
            return Some(body.split_at(len));
        }
        shift += 7;
    }
    None
}

/// Decode the tab-separated module info text
fn parse_modinfo(text: &str, path: &Path) -> Option<BuildProvenance> {
    let mut package_path = None;
    let mut main_module = None;
    let mut settings = Vec::new();

    for line in text.lines() {
        let (kind, rest) = match line.split_once('\t') {
            Some(parts) => parts,
            None => continue,
        };
        match kind {
            "path" => package_path = Some(rest.to_string()),
            "mod" => {
                let mut fields = rest.split('\t');
                let module = fields.next().unwrap_or_default();
                let version = fields.next().unwrap_or_default();
                main_module = Some((module.to_string(), version.to_string()));
            }
            "build" => {
                if let Some(setting) = parse_setting(rest) {
                    settings.push(setting);
                }
            }
            _ => {}
        }
    }

    let (module_path, version) = main_module?;
    if module_path.is_empty() {
        return None;
    }
    Some(BuildProvenance {
        source_path: path.to_path_buf(),
        go_version: String::new(),
        package_path: package_path.unwrap_or_else(|| module_path.clone()),
        module_path,
        version,
        settings,
    })
}

/// Parse `key=value`, where either side may be a quoted string
fn parse_setting(raw: &str) -> Option<(String, String)> {
    let (key, value) = if raw.starts_with('"') {
        let end = closing_quote(raw)?;
        let key = unquote(&raw[..=end]);
        let value = raw[end + 1..].strip_prefix('=')?;
        (key, value)
    } else {
        let (key, value) = raw.split_once('=')?;
        (key.to_string(), value)
    };
    Some((key, unquote(value)))
}

fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn unquote(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        if let Ok(unquoted) = serde_json::from_str::<String>(s) {
            return unquoted;
        }
    }
    s.to_string()
}
