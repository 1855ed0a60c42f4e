use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use shadercache::{
    CacheConfig, CompileOptions, CompiledShader, CompilerBackend, FsSourceLoader, ShaderCompiler,
    ShaderStage, SpirvVersion, StageReflection,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{BuildArgs, Cli, Command, CompileArgs, ReflectArgs};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let options = resolve_options(&cli.compile)?;
    tracing::debug!(
        dir = %cli.compile.dir.display(),
        backend = %options.backend,
        spirv = %options.spirv_version,
        defines = options.defines.len(),
        "resolved compile options"
    );
    let compiler = ShaderCompiler::from_directory(&cli.compile.dir, options, Arc::new(FsSourceLoader))
        .with_context(|| format!("failed to load shaders from {}", cli.compile.dir.display()))?;

    match cli.command {
        Command::List => list(&compiler),
        Command::Check => check(&compiler),
        Command::Build(args) => build(&compiler, &args),
        Command::Reflect(args) => reflect(&compiler, &args),
    }
}

fn initialise_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,naga=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_options(args: &CompileArgs) -> Result<CompileOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let config = CacheConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            config.compile_options()
        }
        None => CompileOptions::default(),
    };

    if let Some(backend) = args.shader_compiler {
        options.backend = backend;
    }
    if let Some(version) = args.spirv_version {
        options.spirv_version = version;
    }
    options.optimize |= args.optimize;
    for (name, value) in &args.defines {
        options.defines.insert(name.clone(), value.clone());
    }

    if !options.backend.is_available() {
        bail!("{} support is not enabled in this build", options.backend);
    }
    Ok(options)
}

fn list(compiler: &ShaderCompiler) -> Result<()> {
    let names = compiler.names();
    if names.is_empty() {
        tracing::warn!("no shader pairs found");
    }
    for name in names {
        if let Some(paths) = compiler.paths(&name) {
            println!(
                "{name}\t{}\t{}",
                paths.vertex().display(),
                paths.fragment().display()
            );
        }
    }
    Ok(())
}

fn check(compiler: &ShaderCompiler) -> Result<()> {
    let report = compiler.warm_all();
    for (_, err) in &report.failed {
        eprintln!("error: {err}");
    }
    if !report.is_success() {
        bail!(
            "{} of {} shaders failed to compile",
            report.failed.len(),
            report.failed.len() + report.compiled.len()
        );
    }
    println!("{} shaders compiled", report.compiled.len());
    Ok(())
}

#[derive(Debug, Serialize)]
struct BuildManifest {
    backend: CompilerBackend,
    spirv_version: SpirvVersion,
    optimize: bool,
    shaders: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    name: String,
    vertex: String,
    fragment: String,
    vertex_words: usize,
    fragment_words: usize,
}

fn build(compiler: &ShaderCompiler, args: &BuildArgs) -> Result<()> {
    // Nothing is written unless every shader compiles.
    check(compiler)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let options = compiler.options();
    let mut manifest = BuildManifest {
        backend: options.backend,
        spirv_version: options.spirv_version,
        optimize: options.optimize,
        shaders: Vec::new(),
    };
    for name in compiler.names() {
        let shader = compiler.get_by_name(&name)?;
        let vertex = write_stage(&args.out, &shader, ShaderStage::Vertex)?;
        let fragment = write_stage(&args.out, &shader, ShaderStage::Fragment)?;
        manifest.shaders.push(ManifestEntry {
            name,
            vertex,
            fragment,
            vertex_words: shader.vertex().len(),
            fragment_words: shader.fragment().len(),
        });
    }

    let manifest_path = args.out.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&manifest_path, json)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;
    tracing::info!(
        out = %args.out.display(),
        shaders = manifest.shaders.len(),
        "wrote SPIR-V artifacts"
    );
    Ok(())
}

/// Writes one stage as little-endian SPIR-V and returns the file name.
fn write_stage(out: &Path, shader: &CompiledShader, stage: ShaderStage) -> Result<String> {
    let file_name = format!("{}.{}.spv", shader.name(), stage.extension());
    let path = out.join(&file_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let bytes: Vec<u8> = shader
        .stage(stage)
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect();
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(file_name)
}

#[derive(Debug, Serialize)]
struct ShaderReflection {
    name: String,
    vertex: StageReflection,
    fragment: StageReflection,
}

fn reflect(compiler: &ShaderCompiler, args: &ReflectArgs) -> Result<()> {
    let shader = compiler.get_by_name(&args.name)?;
    let reflection = ShaderReflection {
        name: shader.name().to_string(),
        vertex: shader.reflect(ShaderStage::Vertex)?,
        fragment: shader.reflect(ShaderStage::Fragment)?,
    };
    println!("{}", serde_json::to_string_pretty(&reflection)?);
    Ok(())
}
