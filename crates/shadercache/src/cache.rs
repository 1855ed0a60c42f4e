//! The process-wide shader cache and its lifecycle.
//!
//! ```text
//! UNINITIALISED --the()/initialise()--> LIVE --shutdown()--> DESTROYED
//! ```
//!
//! `DESTROYED` is terminal: every later `the()`, `get_from_cache` or
//! `shutdown` reports [`UsageError::ShutDown`]. Applications that would rather
//! own the cache build one with [`ShaderCache::new`] and drop it themselves.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::artifact::CompiledShader;
use crate::compiler::{ShaderCompiler, WarmReport};
use crate::config::CacheConfig;
use crate::error::{ShaderCacheError, UsageError};
use crate::resources::resource_root;
use crate::source::{FsSourceLoader, SourceLoader};

/// Observable state of the process-wide cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialised,
    Live,
    Destroyed,
}

enum CacheState {
    Uninitialised,
    Live(Arc<ShaderCache>),
    Destroyed,
}

static CACHE: Mutex<CacheState> = Mutex::new(CacheState::Uninitialised);

#[derive(Debug)]
pub struct ShaderCache {
    compiler: ShaderCompiler,
    shader_dir: Option<PathBuf>,
    closed: AtomicBool,
}

impl ShaderCache {
    /// Builds a cache over `<root>/<config.shader_dir>`.
    pub fn new(config: &CacheConfig, root: &Path) -> Result<Self, ShaderCacheError> {
        Self::with_loader(config, root, Arc::new(FsSourceLoader))
    }

    /// Like [`ShaderCache::new`] with a custom source loader.
    pub fn with_loader(
        config: &CacheConfig,
        root: &Path,
        loader: Arc<dyn SourceLoader>,
    ) -> Result<Self, ShaderCacheError> {
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(crate::config::ConfigError::Invalid(issues).into());
        }
        let shader_dir = config.shader_directory(root);
        let compiler = ShaderCompiler::from_directory(&shader_dir, config.compile_options(), loader)?;
        let cache = Self {
            compiler,
            shader_dir: Some(shader_dir),
            closed: AtomicBool::new(false),
        };
        if config.eager {
            cache.warm();
        }
        Ok(cache)
    }

    /// Wraps a compiler the caller has already populated.
    pub fn with_compiler(compiler: ShaderCompiler) -> Self {
        Self {
            compiler,
            shader_dir: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the process-wide cache, constructing it on first call from the
    /// resource root and its optional `shadercache.toml`.
    pub fn the() -> Result<Arc<ShaderCache>, ShaderCacheError> {
        let mut state = CACHE.lock();
        match &*state {
            CacheState::Live(cache) => return Ok(Arc::clone(cache)),
            CacheState::Destroyed => return Err(UsageError::ShutDown.into()),
            CacheState::Uninitialised => {}
        }

        let root = resource_root()?;
        let config = CacheConfig::load_or_default(&root)?;
        let cache = Arc::new(ShaderCache::new(&config, &root)?);
        info!(
            root = %root.display(),
            shaders = cache.compiler.names().len(),
            backend = %config.backend,
            "shader cache initialised"
        );
        *state = CacheState::Live(Arc::clone(&cache));
        Ok(cache)
    }

    /// Constructs the process-wide cache now rather than on first lookup.
    /// Calling it again is a no-op.
    pub fn initialise() -> Result<(), ShaderCacheError> {
        Self::the().map(|_| ())
    }

    /// Destroys the process-wide cache, releasing every compiled shader.
    pub fn shutdown() -> Result<(), ShaderCacheError> {
        let mut state = CACHE.lock();
        match std::mem::replace(&mut *state, CacheState::Destroyed) {
            CacheState::Live(cache) => {
                cache.close()?;
                info!("shader cache shut down");
                Ok(())
            }
            CacheState::Uninitialised => {
                *state = CacheState::Uninitialised;
                Err(UsageError::NotInitialised.into())
            }
            CacheState::Destroyed => Err(UsageError::ShutDown.into()),
        }
    }

    /// Current state of the process-wide cache.
    pub fn lifecycle() -> Lifecycle {
        match &*CACHE.lock() {
            CacheState::Uninitialised => Lifecycle::Uninitialised,
            CacheState::Live(_) => Lifecycle::Live,
            CacheState::Destroyed => Lifecycle::Destroyed,
        }
    }

    /// Looks `name` up in the process-wide cache.
    pub fn get(name: &str) -> Result<Arc<CompiledShader>, ShaderCacheError> {
        Self::the()?.get_from_cache(name)
    }

    /// Looks `name` up in this cache, compiling it on first use.
    pub fn get_from_cache(&self, name: &str) -> Result<Arc<CompiledShader>, ShaderCacheError> {
        self.ensure_open()?;
        let shader = self.compiler.get_by_name(name);
        // close() may have landed while the shader compiled.
        self.ensure_open()?;
        shader
    }

    /// Compiles every registered shader that is not compiled yet.
    pub fn warm(&self) -> WarmReport {
        self.compiler.warm_all()
    }

    /// Releases this cache's compiled shaders; later lookups fail with
    /// [`UsageError::ShutDown`].
    pub fn close(&self) -> Result<(), ShaderCacheError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(UsageError::ShutDown.into());
        }
        self.compiler.destroy();
        debug!("shader cache closed");
        Ok(())
    }

    /// True after [`ShaderCache::close`] or a global shutdown.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The compiler behind this cache.
    pub fn compiler(&self) -> &ShaderCompiler {
        &self.compiler
    }

    /// Directory scanned at construction; `None` for a wrapped compiler.
    pub fn shader_dir(&self) -> Option<&Path> {
        self.shader_dir.as_deref()
    }

    fn ensure_open(&self) -> Result<(), ShaderCacheError> {
        if self.is_closed() {
            Err(UsageError::ShutDown.into())
        } else {
            Ok(())
        }
    }
}
