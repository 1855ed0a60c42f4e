//! Shader artifact cache: maps a logical shader name to SPIR-V for its vertex
//! and fragment stages, compiling GLSL on first request and serving every
//! later request from memory.
//!
//! ```text
//!   ShaderCache::the() ──▶ ShaderCompiler ──▶ ArtifactStore (name → Arc<CompiledShader>)
//!                               │
//!                               ├─ SourceLoader::read_source   (vertex + fragment text)
//!                               └─ compile_stage ×2           (naga or shaderc → SPIR-V words)
//! ```
//!
//! The directory scanned for shaders is `<resource root>/shaders` unless a
//! `shadercache.toml` under the resource root says otherwise; see
//! [`CacheConfig`] and [`resources`].
mod artifact;
mod cache;
mod compile;
mod compiler;
mod config;
mod error;
mod reflect;
pub mod resources;
mod source;
mod store;
mod types;

pub use artifact::CompiledShader;
pub use cache::{Lifecycle, ShaderCache};
pub use compile::SPIRV_MAGIC;
pub use compiler::{ShaderCompiler, WarmReport};
pub use config::{CacheConfig, ConfigError, CONFIG_FILE_NAME};
pub use error::{ShaderCacheError, UsageError};
pub use reflect::{PushConstantRange, SampledKind, SampledResource, StageReflection, UniformBuffer};
pub use resources::{resource_root, set_resource_root};
pub use source::{discover_shaders, FsSourceLoader, ShaderSourcePaths, SourceLoader};
pub use store::ArtifactStore;
pub use types::{CompileOptions, CompilerBackend, ShaderStage, SpirvVersion};
