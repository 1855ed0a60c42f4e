//! Process-wide resource root that the global cache resolves its shader
//! directory against.
//!
//! Resolution order: a root installed with [`set_resource_root`], then the
//! `SHADERCACHE_RESOURCE_ROOT` environment variable, then `app/resources` or
//! `resources` under the working directory.
use std::env;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ShaderCacheError;

pub const ENV_RESOURCE_ROOT: &str = "SHADERCACHE_RESOURCE_ROOT";

static RESOURCE_ROOT: RwLock<Option<PathBuf>> = RwLock::new(None);

pub fn set_resource_root(root: impl Into<PathBuf>) {
    let root = root.into();
    debug!(root = %root.display(), "resource root installed");
    *RESOURCE_ROOT.write() = Some(root);
}

pub fn resource_root() -> Result<PathBuf, ShaderCacheError> {
    if let Some(root) = RESOURCE_ROOT.read().clone() {
        return Ok(root);
    }

    if let Some(value) = env::var_os(ENV_RESOURCE_ROOT) {
        if !value.is_empty() {
            let root = PathBuf::from(value);
            debug!(root = %root.display(), "resource root from {ENV_RESOURCE_ROOT}");
            return Ok(root);
        }
    }

    let cwd = env::current_dir().map_err(|err| {
        ShaderCacheError::ResourceRoot(format!("failed to resolve working directory: {err}"))
    })?;
    discover_from(&cwd).ok_or_else(|| {
        ShaderCacheError::ResourceRoot(format!(
            "no 'app/resources' or 'resources' directory under {}; set {ENV_RESOURCE_ROOT}",
            cwd.display()
        ))
    })
}

fn discover_from(cwd: &Path) -> Option<PathBuf> {
    [cwd.join("app").join("resources"), cwd.join("resources")]
        .into_iter()
        .find(|candidate| candidate.is_dir())
}
