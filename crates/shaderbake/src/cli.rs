use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shadercache::{CompilerBackend, SpirvVersion};

#[derive(Parser, Debug)]
#[command(
    name = "shaderbake",
    author,
    version,
    about = "Compile GLSL vertex/fragment shader pairs to SPIR-V"
)]
pub struct Cli {
    #[command(flatten)]
    pub compile: CompileArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Directory holding `<name>.vert` / `<name>.frag` pairs (searched recursively).
    #[arg(
        long,
        short,
        value_name = "DIR",
        env = "SHADERBAKE_DIR",
        default_value = "resources/shaders",
        global = true
    )]
    pub dir: PathBuf,

    /// `shadercache.toml` to take backend, defines and SPIR-V version from.
    /// Its `shader_dir` is ignored; `--dir` always wins.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Shader compiler backend: `naga` or `shaderc`.
    #[arg(long, value_name = "COMPILER", value_parser = parse_shader_compiler, global = true)]
    pub shader_compiler: Option<CompilerBackend>,

    /// Preprocessor define applied to every stage (repeatable).
    #[arg(
        long = "define",
        short = 'D',
        value_name = "NAME[=VALUE]",
        value_parser = parse_define,
        global = true
    )]
    pub defines: Vec<(String, String)>,

    /// Ask the backend to optimise for performance.
    #[arg(long, global = true)]
    pub optimize: bool,

    /// Target SPIR-V version, `1.0` to `1.6`.
    #[arg(long, value_name = "VERSION", value_parser = parse_spirv_version, global = true)]
    pub spirv_version: Option<SpirvVersion>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every shader pair found in the directory.
    List,
    /// Compile every shader and report diagnostics; fails if any shader fails.
    Check,
    /// Compile every shader and write `<name>.vert.spv`, `<name>.frag.spv` and `manifest.json`.
    Build(BuildArgs),
    /// Print the resource layout of one shader as JSON.
    Reflect(ReflectArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Output directory; created if missing.
    #[arg(long, short, value_name = "DIR")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ReflectArgs {
    /// Logical shader name (file stem of the pair).
    #[arg(value_name = "NAME")]
    pub name: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_shader_compiler(value: &str) -> Result<CompilerBackend, String> {
    let backend: CompilerBackend = value.parse()?;
    if !backend.is_available() {
        return Err(format!("{backend} support is not enabled in this build"));
    }
    Ok(backend)
}

pub fn parse_spirv_version(value: &str) -> Result<SpirvVersion, String> {
    value.parse()
}

pub fn parse_define(value: &str) -> Result<(String, String), String> {
    let trimmed = value.trim();
    let (name, definition) = match trimmed.split_once('=') {
        Some((name, definition)) => (name.trim(), definition.trim()),
        None => (trimmed, "1"),
    };
    if name.is_empty() {
        return Err("define name must not be empty".to_string());
    }
    if !name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
        || name.starts_with(|c: char| c.is_ascii_digit())
    {
        return Err(format!("'{name}' is not a valid preprocessor identifier"));
    }
    Ok((name.to_string(), definition.to_string()))
}
