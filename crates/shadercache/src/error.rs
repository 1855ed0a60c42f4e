use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::types::{CompilerBackend, ShaderStage};

/// Everything that can go wrong between a shader name and its SPIR-V.
#[derive(Debug, Error)]
pub enum ShaderCacheError {
    #[error("failed to read shader source {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile {stage} stage of shader '{name}': {diagnostic}")]
    Compilation {
        name: String,
        stage: ShaderStage,
        diagnostic: String,
    },

    #[error("shader '{0}' is not registered")]
    UnknownShader(String),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("shader name must not be empty")]
    InvalidName,

    #[error(
        "shader '{name}' is defined more than once ({} and {})",
        .first.display(),
        .second.display()
    )]
    DuplicateShader {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("shader directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to scan shader directory: {0}")]
    Scan(#[from] walkdir::Error),

    #[error("unable to resolve resource root: {0}")]
    ResourceRoot(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} backend is not enabled in this build")]
    BackendUnavailable(CompilerBackend),

    #[error("failed to reflect {stage} stage of shader '{name}': {message}")]
    Reflection {
        name: String,
        stage: ShaderStage,
        message: String,
    },
}

/// Lifecycle misuse of the process-wide cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("shader cache accessed before initialisation")]
    NotInitialised,
    #[error("shader cache accessed after shutdown")]
    ShutDown,
}

impl ShaderCacheError {
    pub(crate) fn compilation(name: &str, stage: ShaderStage, diagnostic: impl Into<String>) -> Self {
        Self::Compilation {
            name: name.to_string(),
            stage,
            diagnostic: diagnostic.into(),
        }
    }

    /// Stage that failed, for compilation and reflection errors.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            Self::Compilation { stage, .. } | Self::Reflection { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

/// Flattens an error and its `source()` chain into one line.
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        current = cause.source();
    }
    message
}
