//! Owns the set of known shaders and turns them into SPIR-V on demand.
//!
//! A shader is *registered* once its source paths are known (from a directory
//! scan or [`ShaderCompiler::register`]) and *compiled* the first time someone
//! asks for it. Compilation is all-or-nothing per name: both stages must
//! succeed before anything lands in the [`ArtifactStore`].
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::artifact::CompiledShader;
use crate::compile::compile_stage;
use crate::error::ShaderCacheError;
use crate::source::{discover_shaders, FsSourceLoader, ShaderSourcePaths, SourceLoader};
use crate::store::ArtifactStore;
use crate::types::{CompileOptions, ShaderStage};

pub struct ShaderCompiler {
    options: CompileOptions,
    loader: Arc<dyn SourceLoader>,
    registry: RwLock<BTreeMap<String, ShaderSourcePaths>>,
    store: ArtifactStore,
}

/// Outcome of [`ShaderCompiler::warm_all`].
#[derive(Debug, Default)]
pub struct WarmReport {
    pub compiled: Vec<String>,
    pub failed: Vec<(String, ShaderCacheError)>,
}

impl WarmReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ShaderCompiler {
    /// Compiler reading sources from the filesystem, with nothing registered.
    pub fn new(options: CompileOptions) -> Self {
        Self::with_loader(options, Arc::new(FsSourceLoader))
    }

    pub fn with_loader(options: CompileOptions, loader: Arc<dyn SourceLoader>) -> Self {
        Self {
            options,
            loader,
            registry: RwLock::new(BTreeMap::new()),
            store: ArtifactStore::new(),
        }
    }

    /// Builds a compiler with every shader pair found under `dir` registered.
    pub fn from_directory(
        dir: &Path,
        options: CompileOptions,
        loader: Arc<dyn SourceLoader>,
    ) -> Result<Self, ShaderCacheError> {
        let compiler = Self::with_loader(options, loader);
        compiler.register_directory(dir)?;
        Ok(compiler)
    }

    /// Options applied to every stage this compiler builds.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Registers `paths` under its name. A name that is already registered
    /// keeps its original paths (and any compiled artifact); returns `false`.
    pub fn register(&self, paths: ShaderSourcePaths) -> bool {
        let mut registry = self.registry.write();
        if let Some(existing) = registry.get(paths.name()) {
            if existing != &paths {
                warn!(
                    shader = %paths.name(),
                    kept = %existing.vertex().display(),
                    ignored = %paths.vertex().display(),
                    "shader already registered with different sources; keeping the first"
                );
            }
            return false;
        }
        debug!(shader = %paths.name(), "registered shader");
        registry.insert(paths.name().to_string(), paths);
        true
    }

    /// Scans `dir` and registers every pair found; returns how many were new.
    pub fn register_directory(&self, dir: &Path) -> Result<usize, ShaderCacheError> {
        let discovered = discover_shaders(dir)?;
        let total = discovered.len();
        let added = discovered
            .into_iter()
            .filter(|paths| self.register(paths.clone()))
            .count();
        info!(dir = %dir.display(), discovered = total, registered = added, "scanned shader directory");
        Ok(added)
    }

    /// Reads and compiles both stages of one shader without touching the store.
    pub fn compile(
        &self,
        name: &str,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<CompiledShader, ShaderCacheError> {
        if name.trim().is_empty() {
            return Err(ShaderCacheError::InvalidName);
        }

        let started = Instant::now();
        let vertex_source = self.loader.read_source(vertex_path)?;
        let fragment_source = self.loader.read_source(fragment_path)?;

        let vertex = compile_stage(name, ShaderStage::Vertex, &vertex_source, &self.options)?;
        let fragment = compile_stage(name, ShaderStage::Fragment, &fragment_source, &self.options)?;

        let shader = CompiledShader::from_stages(name, vertex, fragment);
        info!(
            shader = %name,
            backend = %self.options.backend,
            vertex_words = shader.vertex().len(),
            fragment_words = shader.fragment().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compiled shader"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            log_reflection(&shader);
        }
        Ok(shader)
    }

    /// Returns the compiled shader for `name`, compiling it on first use.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<CompiledShader>, ShaderCacheError> {
        if name.trim().is_empty() {
            return Err(ShaderCacheError::InvalidName);
        }
        if let Some(shader) = self.store.get(name) {
            return Ok(shader);
        }

        let paths = self
            .registry
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ShaderCacheError::UnknownShader(name.to_string()))?;

        self.store.get_or_try_insert_with(name, || {
            // A destroy() since the registry read must not refill the store.
            if !self.is_registered(name) {
                return Err(ShaderCacheError::UnknownShader(name.to_string()));
            }
            self.compile(paths.name(), paths.vertex(), paths.fragment())
        })
    }

    /// Compiles every registered shader that is not compiled yet, in parallel.
    pub fn warm_all(&self) -> WarmReport {
        let pending: Vec<String> = self
            .names()
            .into_iter()
            .filter(|name| !self.store.contains(name))
            .collect();

        let outcomes: Vec<(String, Result<Arc<CompiledShader>, ShaderCacheError>)> = pending
            .into_par_iter()
            .map(|name| {
                let result = self.get_by_name(&name);
                (name, result)
            })
            .collect();

        let mut report = WarmReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(_) => report.compiled.push(name),
                Err(err) => {
                    warn!(shader = %name, error = %err, "shader failed to compile during warm-up");
                    report.failed.push((name, err));
                }
            }
        }
        info!(
            compiled = report.compiled.len(),
            failed = report.failed.len(),
            "shader warm-up finished"
        );
        report
    }

    /// Releases every compiled shader and forgets every registration.
    ///
    /// Registrations go first so a lookup racing this call cannot compile
    /// into the cleared store.
    pub fn destroy(&self) {
        let forgotten = {
            let mut registry = self.registry.write();
            let count = registry.len();
            registry.clear();
            count
        };
        let released = self.store.clear();
        info!(released, forgotten, "destroyed shader compiler");
    }

    /// Registered shader names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.registry.read().keys().cloned().collect()
    }

    /// Source paths registered for `name`.
    pub fn paths(&self, name: &str) -> Option<ShaderSourcePaths> {
        self.registry.read().get(name).cloned()
    }

    /// True once `name` is known, compiled or not.
    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.read().contains_key(name)
    }

    /// True if `name` has a compiled artifact in memory.
    pub fn is_compiled(&self, name: &str) -> bool {
        self.store.contains(name)
    }

    /// Number of shaders compiled so far.
    pub fn compiled_count(&self) -> usize {
        self.store.len()
    }
}

impl std::fmt::Debug for ShaderCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderCompiler")
            .field("options", &self.options)
            .field("registered", &self.registry.read().len())
            .field("compiled", &self.store.len())
            .finish()
    }
}

fn log_reflection(shader: &CompiledShader) {
    for stage in ShaderStage::ALL {
        match shader.reflect(stage) {
            Ok(reflection) => {
                for range in &reflection.push_constant_ranges {
                    debug!(shader = %shader.name(), %stage, offset = range.offset, size = range.size, members = range.member_count, "push constant range");
                }
                for buffer in &reflection.uniform_buffers {
                    debug!(shader = %shader.name(), %stage, name = ?buffer.name, set = buffer.set, binding = buffer.binding, size = buffer.size, "uniform buffer");
                }
                for resource in &reflection.sampled_resources {
                    debug!(shader = %shader.name(), %stage, name = ?resource.name, kind = ?resource.kind, set = resource.set, binding = resource.binding, "sampled resource");
                }
            }
            Err(err) => debug!(shader = %shader.name(), %stage, error = %err, "reflection unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::types::CompilerBackend;

    const VERTEX: &str = "#version 450\nvoid main() { gl_Position = vec4(0.0, 0.0, 0.0, 1.0); }\n";
    const FRAGMENT: &str = "#version 450\nlayout(location = 0) out vec4 o;\nvoid main() { o = vec4(1.0); }\n";
    const BROKEN: &str = "#version 450\nvoid main() { o = ; }\n";

    #[derive(Default)]
    struct CountingLoader {
        reads: AtomicUsize,
    }

    impl SourceLoader for CountingLoader {
        fn read_source(&self, path: &Path) -> Result<String, ShaderCacheError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            FsSourceLoader.read_source(path)
        }
    }

    fn options() -> CompileOptions {
        CompileOptions::default().with_backend(CompilerBackend::NagaGlsl)
    }

    fn write_pair(dir: &Path, name: &str, vertex: &str, fragment: &str) {
        fs::write(dir.join(format!("{name}.vert")), vertex).unwrap();
        fs::write(dir.join(format!("{name}.frag")), fragment).unwrap();
    }

    #[test]
    fn lookup_compiles_once_and_then_serves_from_memory() {
        let temp = tempfile::tempdir().unwrap();
        write_pair(temp.path(), "basic", VERTEX, FRAGMENT);
        let loader = Arc::new(CountingLoader::default());
        let compiler = ShaderCompiler::from_directory(temp.path(), options(), loader.clone()).unwrap();

        assert!(compiler.is_registered("basic"));
        assert!(!compiler.is_compiled("basic"));

        let first = compiler.get_by_name("basic").unwrap();
        let second = compiler.get_by_name("basic").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.vertex(), second.vertex());
        assert_eq!(loader.reads.load(Ordering::SeqCst), 2);
        assert_eq!(compiler.compiled_count(), 1);
    }

    #[test]
    fn fragment_failure_stores_nothing() {
        let temp = tempfile::tempdir().unwrap();
        write_pair(temp.path(), "half", VERTEX, BROKEN);
        let compiler = ShaderCompiler::from_directory(temp.path(), options(), Arc::new(FsSourceLoader)).unwrap();

        for _ in 0..2 {
            let err = compiler.get_by_name("half").unwrap_err();
            assert_eq!(err.stage(), Some(ShaderStage::Fragment));
        }
        assert!(!compiler.is_compiled("half"));
        assert_eq!(compiler.compiled_count(), 0);
    }

    #[test]
    fn unknown_and_empty_names_are_rejected() {
        let compiler = ShaderCompiler::new(options());
        assert!(matches!(
            compiler.get_by_name("nonexistent"),
            Err(ShaderCacheError::UnknownShader(name)) if name == "nonexistent"
        ));
        assert!(matches!(compiler.get_by_name(""), Err(ShaderCacheError::InvalidName)));
        assert!(matches!(
            compiler.compile("", Path::new("a.vert"), Path::new("a.frag")),
            Err(ShaderCacheError::InvalidName)
        ));
    }

    #[test]
    fn missing_source_surfaces_as_io() {
        let temp = tempfile::tempdir().unwrap();
        let compiler = ShaderCompiler::new(options());
        compiler.register(ShaderSourcePaths::in_directory(temp.path(), "ghost").unwrap());
        assert!(matches!(
            compiler.get_by_name("ghost"),
            Err(ShaderCacheError::Io { .. })
        ));
    }

    #[test]
    fn re_registering_keeps_first_sources() {
        let temp = tempfile::tempdir().unwrap();
        write_pair(temp.path(), "basic", VERTEX, FRAGMENT);
        let compiler = ShaderCompiler::new(options());
        let original = ShaderSourcePaths::in_directory(temp.path(), "basic").unwrap();
        assert!(compiler.register(original.clone()));
        let compiled = compiler.get_by_name("basic").unwrap();

        let other = ShaderSourcePaths::new("basic", "elsewhere.vert", "elsewhere.frag").unwrap();
        assert!(!compiler.register(other));
        assert_eq!(compiler.paths("basic"), Some(original));
        assert!(Arc::ptr_eq(&compiled, &compiler.get_by_name("basic").unwrap()));
    }

    #[test]
    fn warm_all_reports_each_shader() {
        let temp = tempfile::tempdir().unwrap();
        write_pair(temp.path(), "good", VERTEX, FRAGMENT);
        write_pair(temp.path(), "bad", BROKEN, FRAGMENT);
        let compiler = ShaderCompiler::from_directory(temp.path(), options(), Arc::new(FsSourceLoader)).unwrap();

        let report = compiler.warm_all();
        assert_eq!(report.compiled, ["good"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad");
        assert_eq!(report.failed[0].1.stage(), Some(ShaderStage::Vertex));
        assert!(!report.is_success());
    }

    #[test]
    fn destroy_forgets_registrations() {
        let temp = tempfile::tempdir().unwrap();
        write_pair(temp.path(), "basic", VERTEX, FRAGMENT);
        let compiler = ShaderCompiler::from_directory(temp.path(), options(), Arc::new(FsSourceLoader)).unwrap();
        let held = compiler.get_by_name("basic").unwrap();

        compiler.destroy();
        assert!(matches!(
            compiler.get_by_name("basic"),
            Err(ShaderCacheError::UnknownShader(_))
        ));
        assert_eq!(compiler.compiled_count(), 0);
        assert!(!held.vertex().is_empty());

        compiler.register_directory(temp.path()).unwrap();
        assert!(compiler.get_by_name("basic").is_ok());
    }
}
