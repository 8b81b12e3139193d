// Renderer items

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::handle::{NativeHandle, NativeResource, RawHandle, ResourceKind};
use crate::host::HostRuntime;

impl<H: HostRuntime> Bridge<H> {
    /// Wrap a renderer item reported by a renderer discoverer event
    pub fn renderer_new(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        engine_peer: &H::Peer,
        raw_item: usize,
    ) -> Result<NativeHandle> {
        let engine = self.parent_engine(env, engine_peer)?;
        let item = RawHandle::new(raw_item)
            .ok_or_else(|| BridgeError::illegal_argument("renderer item is null"))?;

        self.create(env, peer, ResourceKind::Renderer, Some(engine), |owner| {
            let renderer = self.engine.hold_renderer(item)?;
            owner.resource = Some(NativeResource::Renderer(renderer));
            Ok(())
        })
    }

    pub fn renderer_release(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        self.release(env, peer)
    }
}
