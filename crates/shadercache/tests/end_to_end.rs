use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use shadercache::{
    CacheConfig, CompilerBackend, FsSourceLoader, ShaderCache, ShaderCacheError, ShaderStage,
    SourceLoader, SPIRV_MAGIC,
};

const VERTEX: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(v_uv, 0.0, 1.0);
}
";

const BROKEN_VERTEX: &str = r"#version 450
void main() {
    gl_Position = vec4(0.0, 0.0, 0.0 1.0);
}
";

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

fn naga_config() -> CacheConfig {
    CacheConfig {
        backend: CompilerBackend::NagaGlsl,
        ..CacheConfig::default()
    }
}

fn shader_root() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let shaders = root.path().join("shaders");
    fs::create_dir_all(&shaders).unwrap();
    fs::write(shaders.join("basic.vert"), VERTEX).unwrap();
    fs::write(shaders.join("basic.frag"), FRAGMENT).unwrap();
    fs::write(shaders.join("broken.vert"), BROKEN_VERTEX).unwrap();
    fs::write(shaders.join("broken.frag"), FRAGMENT).unwrap();
    root
}

#[test]
fn basic_shader_compiles_to_two_spirv_modules() {
    let root = shader_root();
    let cache = ShaderCache::new(&naga_config(), root.path()).unwrap();

    let basic = cache.get_from_cache("basic").unwrap();
    assert_eq!(basic.name(), "basic");
    for stage in ShaderStage::ALL {
        let words = basic.stage(stage);
        assert!(!words.is_empty());
        assert_eq!(words[0], SPIRV_MAGIC);
        assert_eq!(basic.stage_bytes(stage).len(), words.len() * 4);
    }

    let repeat = cache.get_from_cache("basic").unwrap();
    assert_eq!(basic.vertex(), repeat.vertex());
    assert_eq!(basic.fragment(), repeat.fragment());
}

#[test]
fn broken_vertex_stage_reports_compilation_error() {
    let root = shader_root();
    let cache = ShaderCache::new(&naga_config(), root.path()).unwrap();

    for _ in 0..2 {
        match cache.get_from_cache("broken") {
            Err(ShaderCacheError::Compilation {
                name,
                stage,
                diagnostic,
            }) => {
                assert_eq!(name, "broken");
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(!diagnostic.trim().is_empty());
            }
            other => panic!("expected compilation error, got {other:?}"),
        }
    }
    assert!(!cache.compiler().is_compiled("broken"));
    assert!(cache.compiler().is_registered("broken"));
}

#[test]
fn concurrent_first_lookups_compile_once() {
    let root = shader_root();
    let loader = Arc::new(CountingLoader::default());
    let cache = Arc::new(ShaderCache::with_loader(&naga_config(), root.path(), loader.clone()).unwrap());
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.get_from_cache("basic").unwrap()
            })
        })
        .collect();
    let shaders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // One compile reads exactly two sources.
    assert_eq!(loader.reads.load(Ordering::SeqCst), 2);
    assert!(shaders.iter().all(|shader| Arc::ptr_eq(shader, &shaders[0])));
}

#[test]
fn unknown_name_never_returns_a_shader() {
    let root = shader_root();
    let cache = ShaderCache::new(&naga_config(), root.path()).unwrap();
    assert!(matches!(
        cache.get_from_cache("nonexistent"),
        Err(ShaderCacheError::UnknownShader(name)) if name == "nonexistent"
    ));
}

#[test]
fn warm_up_compiles_everything_it_can() {
    let root = shader_root();
    let cache = ShaderCache::new(&naga_config(), root.path()).unwrap();

    let report = cache.warm();
    assert_eq!(report.compiled, ["basic"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "broken");
    assert_eq!(cache.compiler().compiled_count(), 1);
}
