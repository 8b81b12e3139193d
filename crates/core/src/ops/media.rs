// Media items

use crate::bridge::Bridge;
use crate::engine::MediaSource;
use crate::error::{BridgeError, Result};
use crate::event::{Translator, MEDIA_EVENTS};
use crate::handle::{NativeHandle, NativeResource, ResourceKind};
use crate::host::HostRuntime;

impl<H: HostRuntime> Bridge<H> {
    pub fn media_new(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        engine_peer: &H::Peer,
        source: &MediaSource,
    ) -> Result<NativeHandle> {
        let engine = self.parent_engine(env, engine_peer)?;
        match source {
            MediaSource::Location(location) if location.is_empty() => {
                return Err(BridgeError::illegal_argument("media location is empty"));
            }
            MediaSource::Path(path) if path.as_os_str().is_empty() => {
                return Err(BridgeError::illegal_argument("media path is empty"));
            }
            _ => {}
        }

        self.create(env, peer, ResourceKind::Media, Some(engine), |owner| {
            let media = self.engine.new_media(engine, source)?;
            owner.resource = Some(NativeResource::Media(media));
            self.attach_events(owner, Translator::Media, MEDIA_EVENTS);
            Ok(())
        })
    }

    pub fn media_release(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        self.release(env, peer)
    }
}
