//! Locates shader sources on disk and reads them for the compiler.
//!
//! Pairing rule: within a shader directory (searched recursively, in file-name
//! order) `<stem>.vert` and `<stem>.frag` form one shader named `<stem>`. A
//! stem that appears in two subdirectories is rejected rather than guessed at,
//! and a file without its partner is skipped with a warning.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ShaderCacheError;
use crate::types::ShaderStage;

/// Reads full shader source text for the compiler.
pub trait SourceLoader: Send + Sync {
    fn read_source(&self, path: &Path) -> Result<String, ShaderCacheError>;
}

/// [`SourceLoader`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceLoader;

impl SourceLoader for FsSourceLoader {
    fn read_source(&self, path: &Path) -> Result<String, ShaderCacheError> {
        fs::read_to_string(path).map_err(|source| ShaderCacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Logical shader name plus the vertex and fragment sources that make it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSourcePaths {
    name: String,
    vertex: PathBuf,
    fragment: PathBuf,
}

impl ShaderSourcePaths {
    pub fn new(
        name: impl Into<String>,
        vertex: impl Into<PathBuf>,
        fragment: impl Into<PathBuf>,
    ) -> Result<Self, ShaderCacheError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ShaderCacheError::InvalidName);
        }
        Ok(Self {
            name,
            vertex: vertex.into(),
            fragment: fragment.into(),
        })
    }

    /// `<dir>/<name>.vert` and `<dir>/<name>.frag`.
    pub fn in_directory(dir: &Path, name: &str) -> Result<Self, ShaderCacheError> {
        Self::new(
            name,
            dir.join(format!("{name}.{}", ShaderStage::Vertex.extension())),
            dir.join(format!("{name}.{}", ShaderStage::Fragment.extension())),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex(&self) -> &Path {
        &self.vertex
    }

    pub fn fragment(&self) -> &Path {
        &self.fragment
    }

    pub fn path(&self, stage: ShaderStage) -> &Path {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }
}

#[derive(Default)]
struct PartialPair {
    vertex: Option<PathBuf>,
    fragment: Option<PathBuf>,
}

impl PartialPair {
    fn slot(&mut self, stage: ShaderStage) -> &mut Option<PathBuf> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }
}

/// Scans `dir` for vertex/fragment pairs, returned sorted by name.
pub fn discover_shaders(dir: &Path) -> Result<Vec<ShaderSourcePaths>, ShaderCacheError> {
    if !dir.is_dir() {
        return Err(ShaderCacheError::MissingDirectory(dir.to_path_buf()));
    }

    let mut pairs: BTreeMap<String, PartialPair> = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(stage) = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ShaderStage::from_extension)
        else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(path = %path.display(), "skipping shader with non UTF-8 file name");
            continue;
        };
        if stem.is_empty() {
            continue;
        }

        let slot = pairs.entry(stem.to_string()).or_default().slot(stage);
        if let Some(first) = slot.as_ref() {
            return Err(ShaderCacheError::DuplicateShader {
                name: stem.to_string(),
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }
        *slot = Some(path.to_path_buf());
    }

    let mut shaders = Vec::with_capacity(pairs.len());
    for (name, pair) in pairs {
        match (pair.vertex, pair.fragment) {
            (Some(vertex), Some(fragment)) => {
                debug!(shader = %name, vertex = %vertex.display(), fragment = %fragment.display(), "discovered shader");
                shaders.push(ShaderSourcePaths {
                    name,
                    vertex,
                    fragment,
                });
            }
            (Some(lonely), None) | (None, Some(lonely)) => {
                warn!(shader = %name, path = %lonely.display(), "skipping shader without a matching stage");
            }
            (None, None) => {}
        }
    }
    Ok(shaders)
}
