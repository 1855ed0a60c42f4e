//! `shadercache.toml` settings: where the shader sources live relative to the
//! resource root and how they are compiled.
//!
//! ```toml
//! shader_dir = "shaders"
//! backend = "naga"
//! optimize = false
//! spirv_version = "1.1"
//! eager = false
//!
//! [defines]
//! MAX_LIGHTS = "4"
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{CompileOptions, CompilerBackend, SpirvVersion};

pub const CONFIG_FILE_NAME: &str = "shadercache.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Shader source directory; relative paths resolve against the resource root.
    pub shader_dir: PathBuf,
    pub backend: CompilerBackend,
    pub optimize: bool,
    pub spirv_version: SpirvVersion,
    /// Compile every discovered shader when the cache is constructed.
    pub eager: bool,
    pub defines: BTreeMap<String, String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("shaders"),
            backend: CompilerBackend::default(),
            optimize: false,
            spirv_version: SpirvVersion::default(),
            eager: false,
            defines: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = toml::from_str(raw)?;
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reads `<root>/shadercache.toml`, falling back to defaults when absent.
    pub fn load_or_default(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading shader cache configuration");
            Self::load(&path)
        } else {
            tracing::debug!(root = %root.display(), "no shader cache configuration, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.shader_dir.as_os_str().is_empty() {
            issues.push("shader_dir must not be empty".to_string());
        }
        if !self.backend.is_available() {
            issues.push(format!("{} backend is not enabled in this build", self.backend));
        }
        for name in self.defines.keys() {
            if !is_macro_name(name) {
                issues.push(format!("define '{name}' is not a valid preprocessor identifier"));
            }
        }
        issues
    }

    pub fn shader_directory(&self, root: &Path) -> PathBuf {
        if self.shader_dir.is_absolute() {
            self.shader_dir.clone()
        } else {
            root.join(&self.shader_dir)
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            backend: self.backend,
            optimize: self.optimize,
            spirv_version: self.spirv_version,
            defines: self.defines.clone(),
        }
    }
}

fn is_macro_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CacheConfig::from_toml_str("").unwrap();
        assert_eq!(config, CacheConfig::default());
        assert_eq!(config.shader_dir, PathBuf::from("shaders"));
    }

    #[test]
    fn parses_full_document() {
        let config = CacheConfig::from_toml_str(
            r#"
            shader_dir = "gpu/glsl"
            backend = "naga"
            optimize = true
            spirv_version = "1.3"
            eager = true

            [defines]
            MAX_LIGHTS = "4"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, CompilerBackend::NagaGlsl);
        assert!(config.optimize);
        assert!(config.eager);
        assert_eq!(config.spirv_version.as_tuple(), (1, 3));
        let options = config.compile_options();
        assert_eq!(options.defines.get("MAX_LIGHTS").map(String::as_str), Some("4"));
        assert_eq!(
            config.shader_directory(Path::new("/assets")),
            PathBuf::from("/assets/gpu/glsl")
        );
    }

    #[test]
    fn rejects_unknown_keys_and_bad_defines() {
        assert!(matches!(
            CacheConfig::from_toml_str("hot_reload = true"),
            Err(ConfigError::Parse(_))
        ));

        let err = CacheConfig::from_toml_str("[defines]\n\"1BAD\" = \"1\"").unwrap_err();
        match err {
            ConfigError::Invalid(issues) => assert!(issues[0].contains("1BAD")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_config_lists_every_issue() {
        let err = ConfigError::Invalid(vec![
            "define '1BAD' is not a valid macro name".to_string(),
            "shader_dir must not be empty".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: define '1BAD' is not a valid macro name; shader_dir must not be empty"
        );
    }

    #[test]
    fn load_or_default_reads_file_under_root() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(
            CacheConfig::load_or_default(temp.path()).unwrap(),
            CacheConfig::default()
        );

        fs::write(temp.path().join(CONFIG_FILE_NAME), "shader_dir = \"glsl\"\n").unwrap();
        let config = CacheConfig::load_or_default(temp.path()).unwrap();
        assert_eq!(config.shader_directory(temp.path()), temp.path().join("glsl"));
    }
}
