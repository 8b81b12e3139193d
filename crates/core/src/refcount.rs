// Shared engine handle reference counting

use crate::engine::Engine;
use crate::handle::EngineHandle;
use std::sync::Arc;

/// One reference on the shared engine handle, held by a derived object.
///
/// Acquiring retains once, dropping releases once. The engine frees its
/// instance when the last reference goes away.
pub struct EngineRetain {
    engine: Arc<dyn Engine>,
    handle: EngineHandle,
}

impl EngineRetain {
    pub fn acquire(engine: Arc<dyn Engine>, handle: EngineHandle) -> Self {
        engine.retain(handle);
        Self { engine, handle }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle
    }
}

impl Drop for EngineRetain {
    fn drop(&mut self) {
        self.engine.release(self.handle);
    }
}
