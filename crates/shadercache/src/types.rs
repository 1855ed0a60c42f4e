use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pipeline stage a source file is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// File extension (without the dot) that marks a source for this stage.
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "vert" => Some(ShaderStage::Vertex),
            "frag" => Some(ShaderStage::Fragment),
            _ => None,
        }
    }

    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Shader compilation backend requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerBackend {
    /// Compile GLSL through shaderc (requires the `shaderc` feature).
    Shaderc,
    /// Hand GLSL to naga's built-in frontend and SPIR-V writer.
    #[serde(rename = "naga", alias = "naga-glsl")]
    NagaGlsl,
}

impl CompilerBackend {
    pub fn is_available(self) -> bool {
        match self {
            CompilerBackend::Shaderc => cfg!(feature = "shaderc"),
            CompilerBackend::NagaGlsl => true,
        }
    }
}

impl Default for CompilerBackend {
    fn default() -> Self {
        if cfg!(feature = "shaderc") {
            CompilerBackend::Shaderc
        } else {
            CompilerBackend::NagaGlsl
        }
    }
}

impl fmt::Display for CompilerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerBackend::Shaderc => f.write_str("shaderc"),
            CompilerBackend::NagaGlsl => f.write_str("naga"),
        }
    }
}

impl FromStr for CompilerBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("shader compiler must not be empty".to_string());
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "shaderc" => Ok(CompilerBackend::Shaderc),
            "naga" | "naga-glsl" => Ok(CompilerBackend::NagaGlsl),
            other => Err(format!(
                "unknown shader compiler '{other}' (expected shaderc or naga)"
            )),
        }
    }
}

/// Target SPIR-V language version, `1.0` through `1.6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpirvVersion {
    major: u8,
    minor: u8,
}

impl SpirvVersion {
    pub const MAX_MINOR: u8 = 6;

    pub fn new(major: u8, minor: u8) -> Option<Self> {
        if major == 1 && minor <= Self::MAX_MINOR {
            Some(Self { major, minor })
        } else {
            None
        }
    }

    pub fn as_tuple(self) -> (u8, u8) {
        (self.major, self.minor)
    }

    pub fn minor(self) -> u8 {
        self.minor
    }
}

impl Default for SpirvVersion {
    fn default() -> Self {
        Self { major: 1, minor: 1 }
    }
}

impl fmt::Display for SpirvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SpirvVersion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (major, minor) = trimmed
            .split_once('.')
            .ok_or_else(|| format!("invalid SPIR-V version '{trimmed}'; expected e.g. 1.1"))?;
        let major: u8 = major
            .parse()
            .map_err(|_| format!("invalid SPIR-V major version in '{trimmed}'"))?;
        let minor: u8 = minor
            .parse()
            .map_err(|_| format!("invalid SPIR-V minor version in '{trimmed}'"))?;
        Self::new(major, minor)
            .ok_or_else(|| format!("unsupported SPIR-V version {trimmed}; supported 1.0 to 1.6"))
    }
}

impl TryFrom<String> for SpirvVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpirvVersion> for String {
    fn from(value: SpirvVersion) -> Self {
        value.to_string()
    }
}

/// Settings applied to every stage compiled by a [`crate::ShaderCompiler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub backend: CompilerBackend,
    /// Request performance optimisation (honoured by shaderc only).
    pub optimize: bool,
    pub spirv_version: SpirvVersion,
    /// Preprocessor macros, like `-DNAME=VALUE`.
    pub defines: BTreeMap<String, String>,
}

impl CompileOptions {
    pub fn with_backend(mut self, backend: CompilerBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_extensions_round_trip() {
        for stage in ShaderStage::ALL {
            assert_eq!(ShaderStage::from_extension(stage.extension()), Some(stage));
        }
        assert_eq!(ShaderStage::from_extension("comp"), None);
    }

    #[test]
    fn parses_backend_aliases() {
        assert_eq!("naga".parse::<CompilerBackend>(), Ok(CompilerBackend::NagaGlsl));
        assert_eq!(" Naga-GLSL ".parse::<CompilerBackend>(), Ok(CompilerBackend::NagaGlsl));
        assert_eq!("shaderc".parse::<CompilerBackend>(), Ok(CompilerBackend::Shaderc));
        assert!("glslang".parse::<CompilerBackend>().is_err());
        assert!("".parse::<CompilerBackend>().is_err());
    }

    #[test]
    fn naga_backend_is_always_available() {
        assert!(CompilerBackend::NagaGlsl.is_available());
        assert!(CompilerBackend::default().is_available());
    }

    #[test]
    fn spirv_version_parsing_enforces_range() {
        assert_eq!("1.3".parse::<SpirvVersion>().unwrap().as_tuple(), (1, 3));
        assert!("1.7".parse::<SpirvVersion>().is_err());
        assert!("2.0".parse::<SpirvVersion>().is_err());
        assert!("13".parse::<SpirvVersion>().is_err());
        assert_eq!(SpirvVersion::default().to_string(), "1.1");
    }
}
