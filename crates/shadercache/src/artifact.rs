use std::sync::Arc;

use crate::error::ShaderCacheError;
use crate::reflect::{reflect_stage, StageReflection};
use crate::types::ShaderStage;

/// SPIR-V for both stages of one shader.
///
/// Only the compiler builds these, and only after both stages succeeded, so a
/// `CompiledShader` never holds a half-compiled pair. Bytecode is shared, so
/// cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    name: String,
    vertex: Arc<[u32]>,
    fragment: Arc<[u32]>,
}

impl CompiledShader {
    pub(crate) fn from_stages(name: &str, vertex: Vec<u32>, fragment: Vec<u32>) -> Self {
        debug_assert!(!vertex.is_empty() && !fragment.is_empty());
        Self {
            name: name.to_string(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex(&self) -> &[u32] {
        &self.vertex
    }

    pub fn fragment(&self) -> &[u32] {
        &self.fragment
    }

    pub fn stage(&self, stage: ShaderStage) -> &[u32] {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    /// Stage bytecode as native-endian bytes, ready for a driver upload.
    pub fn stage_bytes(&self, stage: ShaderStage) -> &[u8] {
        bytemuck::cast_slice(self.stage(stage))
    }

    pub fn word_count(&self) -> usize {
        self.vertex.len() + self.fragment.len()
    }

    /// Resource layout of one stage, parsed back out of its SPIR-V.
    pub fn reflect(&self, stage: ShaderStage) -> Result<StageReflection, ShaderCacheError> {
        reflect_stage(&self.name, stage, self.stage(stage))
    }
}
