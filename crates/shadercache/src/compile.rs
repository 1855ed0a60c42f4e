use tracing::{trace, warn};

use crate::error::{describe, ShaderCacheError};
use crate::types::{CompileOptions, CompilerBackend, ShaderStage};

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Compiles one stage of GLSL source into SPIR-V words.
///
/// `name` is only used for diagnostics. An empty module is treated as a
/// compilation failure so callers never see a stage without bytecode.
pub(crate) fn compile_stage(
    name: &str,
    stage: ShaderStage,
    source: &str,
    options: &CompileOptions,
) -> Result<Vec<u32>, ShaderCacheError> {
    trace!(shader = %name, %stage, backend = %options.backend, "compiling stage");
    let words = match options.backend {
        CompilerBackend::NagaGlsl => compile_naga(name, stage, source, options)?,
        CompilerBackend::Shaderc => compile_shaderc(name, stage, source, options)?,
    };

    match words.first() {
        None => Err(ShaderCacheError::compilation(
            name,
            stage,
            "compiler produced no bytecode",
        )),
        Some(&word) if word != SPIRV_MAGIC => Err(ShaderCacheError::compilation(
            name,
            stage,
            format!("compiler output is not SPIR-V (leading word {word:#010x})"),
        )),
        Some(_) => Ok(words),
    }
}

fn compile_naga(
    name: &str,
    stage: ShaderStage,
    source: &str,
    options: &CompileOptions,
) -> Result<Vec<u32>, ShaderCacheError> {
    use naga::back::spv;
    use naga::front::glsl;
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    let mut glsl_options = glsl::Options::from(stage.to_naga());
    for (key, value) in &options.defines {
        glsl_options.defines.insert(key.clone(), value.clone());
    }

    let module = glsl::Frontend::default()
        .parse(&glsl_options, source)
        .map_err(|err| ShaderCacheError::compilation(name, stage, describe(&err)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ShaderCacheError::compilation(name, stage, describe(&err)))?;

    if options.optimize {
        trace!(shader = %name, "naga backend ignores the optimize flag");
    }

    // naga's default flags apply wgpu's Y flip; keep stages as written.
    let spv_options = spv::Options {
        lang_version: options.spirv_version.as_tuple(),
        flags: spv::WriterFlags::empty(),
        ..spv::Options::default()
    };
    spv::write_vec(&module, &info, &spv_options, None)
        .map_err(|err| ShaderCacheError::compilation(name, stage, describe(&err)))
}

#[cfg(feature = "shaderc")]
fn compile_shaderc(
    name: &str,
    stage: ShaderStage,
    source: &str,
    options: &CompileOptions,
) -> Result<Vec<u32>, ShaderCacheError> {
    let compiler = shaderc::Compiler::new().map_err(|err| {
        ShaderCacheError::compilation(name, stage, format!("shaderc is not available: {err}"))
    })?;
    let mut compile_options = shaderc::CompileOptions::new().map_err(|err| {
        ShaderCacheError::compilation(name, stage, format!("shaderc options: {err}"))
    })?;

    compile_options.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_1 as u32,
    );
    compile_options.set_target_spirv(shaderc_spirv_version(options.spirv_version.minor()));
    for (key, value) in &options.defines {
        compile_options.add_macro_definition(key, Some(value));
    }
    if options.optimize {
        compile_options.set_optimization_level(shaderc::OptimizationLevel::Performance);
    }

    let kind = match stage {
        ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
        ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
    };
    let file_name = format!("{name}.{}", stage.extension());
    let artifact = compiler
        .compile_into_spirv(source, kind, &file_name, "main", Some(&compile_options))
        .map_err(|err| ShaderCacheError::compilation(name, stage, err.to_string()))?;

    if artifact.get_num_warnings() > 0 {
        warn!(
            shader = %name,
            %stage,
            warnings = %artifact.get_warning_messages(),
            "shaderc reported warnings"
        );
    }

    Ok(artifact.as_binary().to_vec())
}

#[cfg(feature = "shaderc")]
fn shaderc_spirv_version(minor: u8) -> shaderc::SpirvVersion {
    match minor {
        0 => shaderc::SpirvVersion::V1_0,
        1 => shaderc::SpirvVersion::V1_1,
        2 => shaderc::SpirvVersion::V1_2,
        3 => shaderc::SpirvVersion::V1_3,
        4 => shaderc::SpirvVersion::V1_4,
        5 => shaderc::SpirvVersion::V1_5,
        _ => shaderc::SpirvVersion::V1_6,
    }
}

#[cfg(not(feature = "shaderc"))]
fn compile_shaderc(
    name: &str,
    stage: ShaderStage,
    _source: &str,
    _options: &CompileOptions,
) -> Result<Vec<u32>, ShaderCacheError> {
    warn!(shader = %name, %stage, "shaderc requested but not compiled in");
    Err(ShaderCacheError::BackendUnavailable(CompilerBackend::Shaderc))
}
