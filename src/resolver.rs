//! Caller identification from call-site frames and zone roots.

use crate::error::{Error, Result};
use crate::frame;
use smallvec::SmallVec;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Identity of the code calling into the store, derived from its source
/// location.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallerIdentity {
    name: String,
    path: PathBuf,
    zone: String,
}

impl CallerIdentity {
    pub(crate) fn new(name: String, path: PathBuf, zone: String) -> Self {
        Self { name, path, zone }
    }

    /// First path segment under the matched zone root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized absolute source path of the matched frame.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zone label, the final segment of the matched root, lower-cased.
    pub fn zone(&self) -> &str {
        &self.zone
    }
}

#[derive(Clone, Debug)]
struct ZoneRoot {
    path: PathBuf,
    zone: String,
    depth: usize,
}

impl ZoneRoot {
    fn new(path: &Path) -> Result<Self> {
        let path = normalize(path);
        fs::create_dir_all(&path).map_err(|err| {
            Error::Configuration(format!(
                "cannot create zone root {}: {}",
                path.display(),
                err
            ))
        })?;
        let zone = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "unknown".to_owned());
        let depth = path.components().count();
        Ok(Self { path, zone, depth })
    }
}

/// Resolves [`CallerIdentity`] values from the calling thread's
/// call-site frames.
///
/// Roots are normalized once at construction and created on disk if
/// absent; the zone layout is the naming authority, not stored state.
#[derive(Debug)]
pub struct CallerResolver {
    roots: Vec<ZoneRoot>,
}

impl CallerResolver {
    /// Creates a resolver over one or more zone roots. Empty input, or
    /// an empty path, is a configuration error.
    pub fn new<P: AsRef<Path>>(zone_roots: &[P]) -> Result<Self> {
        if zone_roots.is_empty() {
            return Err(Error::Configuration("zone roots cannot be empty".into()));
        }
        let mut roots = Vec::with_capacity(zone_roots.len());
        for root in zone_roots {
            let root = root.as_ref();
            if root.as_os_str().is_empty() {
                return Err(Error::Configuration("zone root path cannot be empty".into()));
            }
            roots.push(ZoneRoot::new(root)?);
        }
        Ok(Self { roots })
    }

    /// Resolves the current caller.
    ///
    /// Frames are visited innermost-first and the first frame lying
    /// under any root wins; within that frame the deepest root wins,
    /// ties going to the first-configured root. A caller can only name
    /// itself, intermediate frames outside every zone are skipped.
    pub fn resolve(&self) -> Result<CallerIdentity> {
        for path in frame::snapshot() {
            let path = normalize(&path);
            let mut matches: SmallVec<[(&ZoneRoot, String); 4]> = SmallVec::new();
            for root in &self.roots {
                if let Ok(rel) = path.strip_prefix(&root.path) {
                    if let Some(Component::Normal(first)) = rel.components().next() {
                        matches.push((root, first.to_string_lossy().into_owned()));
                    }
                }
            }
            // stable sort keeps configuration order for equal depths
            matches.sort_by(|a, b| b.0.depth.cmp(&a.0.depth));
            if let Some((root, name)) = matches.into_iter().next() {
                return Ok(CallerIdentity::new(name, path, root.zone.clone()));
            }
        }
        Err(Error::UnknownCaller)
    }
}

/// Lexical normalization: absolute, with `.` and `..` folded. No
/// filesystem access, frame paths are not required to exist.
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
