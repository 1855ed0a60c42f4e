use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::artifact::CompiledShader;
use crate::error::ShaderCacheError;

type Slot = Arc<Mutex<Option<Arc<CompiledShader>>>>;

/// Name-keyed storage for compiled shaders.
///
/// Each name owns a slot guarded by its own mutex. The first caller for a name
/// compiles while holding that slot, so concurrent first lookups compile once
/// and every caller receives the same `Arc`. A failed compile leaves the slot
/// empty. Entries are never replaced once filled.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl ArtifactStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored shader for `name`, without compiling.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledShader>> {
        let slot = self.slots.read().get(name).cloned()?;
        let shader = slot.lock().clone();
        shader
    }

    /// Returns the stored shader, or runs `compile` and stores its result.
    ///
    /// `compile` runs at most once per successful insert; errors are returned
    /// as-is and nothing is stored.
    pub fn get_or_try_insert_with<F>(
        &self,
        name: &str,
        compile: F,
    ) -> Result<Arc<CompiledShader>, ShaderCacheError>
    where
        F: FnOnce() -> Result<CompiledShader, ShaderCacheError>,
    {
        let slot = self.slot(name);
        let mut guard = slot.lock();
        if let Some(shader) = guard.as_ref() {
            return Ok(Arc::clone(shader));
        }

        let shader = Arc::new(compile()?);
        *guard = Some(Arc::clone(&shader));
        Ok(shader)
    }

    /// Stores an already compiled shader. Returns `false` if the name is taken.
    pub fn insert(&self, shader: CompiledShader) -> bool {
        let slot = self.slot(shader.name());
        let mut guard = slot.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(Arc::new(shader));
        true
    }

    /// True if `name` holds a compiled shader.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of compiled shaders held.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of every stored shader, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Drops every entry and returns how many compiled shaders were released.
    pub fn clear(&self) -> usize {
        let drained: Vec<Slot> = self.slots.write().drain().map(|(_, slot)| slot).collect();
        drained
            .into_iter()
            .filter_map(|slot| slot.lock().take())
            .count()
    }

    fn slot(&self, name: &str) -> Slot {
        if let Some(slot) = self.slots.read().get(name) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(name.to_string()).or_default())
    }
}
