// Media and renderer discoverers

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::event::{Translator, MEDIA_DISCOVERER_EVENTS, RENDERER_DISCOVERER_EVENTS};
use crate::handle::{DiscovererFlavor, NativeHandle, NativeResource, ResourceKind};
use crate::host::HostRuntime;

impl<H: HostRuntime> Bridge<H> {
    /// Create a discoverer of the service called `name`
    pub fn discoverer_new(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        engine_peer: &H::Peer,
        flavor: DiscovererFlavor,
        name: Option<&str>,
    ) -> Result<NativeHandle> {
        let engine = self.parent_engine(env, engine_peer)?;
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(BridgeError::illegal_argument("discoverer name is required")),
        };

        self.create(env, peer, ResourceKind::Discoverer, Some(engine), |owner| {
            let discoverer = self.engine.new_discoverer(engine, flavor, name)?;
            owner.resource = Some(NativeResource::Discoverer(discoverer, flavor));
            let events = match flavor {
                DiscovererFlavor::Media => MEDIA_DISCOVERER_EVENTS,
                DiscovererFlavor::Renderer => RENDERER_DISCOVERER_EVENTS,
            };
            self.attach_events(owner, Translator::Discoverer(flavor), events);
            Ok(())
        })
    }

    pub fn discoverer_start(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let (discoverer, flavor) = self.get(env, peer)?.as_discoverer()?;
        self.engine.start_discoverer(discoverer, flavor)
    }

    pub fn discoverer_stop(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let (discoverer, flavor) = self.get(env, peer)?.as_discoverer()?;
        self.engine.stop_discoverer(discoverer, flavor);
        Ok(())
    }

    pub fn discoverer_release(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        self.release(env, peer)
    }
}
