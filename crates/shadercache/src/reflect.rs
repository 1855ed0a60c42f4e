//! Resource layout recovered from compiled SPIR-V: push-constant ranges,
//! uniform buffers and the images/samplers a stage binds. Works on bytecode
//! from either backend by parsing it back with naga's SPIR-V frontend.
use naga::{AddressSpace, TypeInner};
use serde::Serialize;

use crate::error::{describe, ShaderCacheError};
use crate::types::ShaderStage;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReflection {
    pub push_constant_ranges: Vec<PushConstantRange>,
    pub uniform_buffers: Vec<UniformBuffer>,
    pub sampled_resources: Vec<SampledResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushConstantRange {
    pub stage: ShaderStage,
    pub offset: u32,
    pub size: u32,
    pub member_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniformBuffer {
    pub name: Option<String>,
    pub set: u32,
    pub binding: u32,
    pub size: u32,
    pub member_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampledKind {
    Image,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampledResource {
    pub name: Option<String>,
    pub kind: SampledKind,
    pub set: u32,
    pub binding: u32,
}

impl StageReflection {
    pub fn is_empty(&self) -> bool {
        self.push_constant_ranges.is_empty()
            && self.uniform_buffers.is_empty()
            && self.sampled_resources.is_empty()
    }

    /// Total bytes of push-constant space the stage declares.
    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_ranges
            .iter()
            .map(|range| range.offset + range.size)
            .max()
            .unwrap_or(0)
    }
}

pub(crate) fn reflect_stage(
    name: &str,
    stage: ShaderStage,
    words: &[u32],
) -> Result<StageReflection, ShaderCacheError> {
    let module = naga::front::spv::parse_u8_slice(
        bytemuck::cast_slice(words),
        &naga::front::spv::Options::default(),
    )
    .map_err(|err| ShaderCacheError::Reflection {
        name: name.to_string(),
        stage,
        message: describe(&err),
    })?;

    let ctx = module.to_ctx();
    let mut reflection = StageReflection::default();
    for (_, global) in module.global_variables.iter() {
        let inner = &module.types[global.ty].inner;
        let (size, member_count) = match *inner {
            TypeInner::Struct { ref members, span } => (span, members.len() as u32),
            ref other => (other.size(ctx), 1),
        };

        match global.space {
            AddressSpace::PushConstant => {
                let offset = reflection
                    .push_constant_ranges
                    .last()
                    .map_or(0, |previous| previous.offset + previous.size);
                reflection.push_constant_ranges.push(PushConstantRange {
                    stage,
                    offset,
                    size,
                    member_count,
                });
            }
            AddressSpace::Uniform => {
                let Some(binding) = global.binding.as_ref() else {
                    continue;
                };
                reflection.uniform_buffers.push(UniformBuffer {
                    name: global.name.clone(),
                    set: binding.group,
                    binding: binding.binding,
                    size,
                    member_count,
                });
            }
            AddressSpace::Handle => {
                let kind = match *inner {
                    TypeInner::Image { .. } => SampledKind::Image,
                    TypeInner::Sampler { .. } => SampledKind::Sampler,
                    _ => continue,
                };
                let Some(binding) = global.binding.as_ref() else {
                    continue;
                };
                reflection.sampled_resources.push(SampledResource {
                    name: global.name.clone(),
                    kind,
                    set: binding.group,
                    binding: binding.binding,
                });
            }
            _ => {}
        }
    }

    reflection
        .sampled_resources
        .sort_by_key(|resource| (resource.set, resource.binding));
    reflection
        .uniform_buffers
        .sort_by_key(|buffer| (buffer.set, buffer.binding));
    Ok(reflection)
}
