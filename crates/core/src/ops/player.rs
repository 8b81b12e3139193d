// Media player

use crate::bridge::Bridge;
use crate::engine::Viewpoint;
use crate::error::Result;
#[cfg(feature = "async-stop")]
use crate::event::event_type::PLAYER_STOPPED;
use crate::event::{Translator, PLAYER_EVENTS};
use crate::handle::{NativeHandle, NativeResource, PlayerHandle, ResourceKind};
use crate::host::HostRuntime;
use crate::object::{KindState, Owner, PlayerState};
use crate::stop::SyncStopCoordinator;
use std::sync::Arc;

impl<H: HostRuntime> Bridge<H> {
    /// Create an empty player drawing into `window`
    pub fn player_new(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        engine_peer: &H::Peer,
        window: &H::Peer,
    ) -> Result<NativeHandle> {
        let engine = self.parent_engine(env, engine_peer)?;
        self.create(env, peer, ResourceKind::Player, Some(engine), |owner| {
            let player = self.engine.new_player(engine)?;
            self.init_player(env, owner, player, window)
        })
    }

    /// Create a player for an existing media item. The player runs on the
    /// media's engine.
    pub fn player_new_from_media(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        media_peer: &H::Peer,
        window: &H::Peer,
    ) -> Result<NativeHandle> {
        let media_object = self.get(env, media_peer)?;
        let media = media_object.as_media()?;
        let engine = media_object.engine()?;
        self.create(env, peer, ResourceKind::Player, Some(engine), |owner| {
            let player = self.engine.new_player_from_media(media)?;
            self.init_player(env, owner, player, window)
        })
    }

    fn init_player(
        &self,
        env: &H::Env,
        owner: &mut Owner<H>,
        player: PlayerHandle,
        window: &H::Peer,
    ) -> Result<()> {
        owner.resource = Some(NativeResource::Player(player));

        let window = self.host.retain_object(env, window)?;
        self.engine
            .set_output_window(player, self.host.retained_raw(&window));

        let stop = Arc::new(SyncStopCoordinator::new());
        owner.extra = KindState::Player(PlayerState {
            window,
            viewpoint: None,
            stop: stop.clone(),
        });
        self.attach_events(owner, Translator::Player { stop }, PLAYER_EVENTS);
        Ok(())
    }

    pub fn player_release(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        self.release(env, peer)
    }

    pub fn player_play(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let player = self.get(env, peer)?.as_player()?;
        self.engine.play(player)
    }

    pub fn player_pause(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let player = self.get(env, peer)?.as_player()?;
        self.engine.pause(player);
        Ok(())
    }

    /// Stop playback, returning once the engine reports the player stopped
    #[cfg(feature = "async-stop")]
    pub fn player_stop(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let object = self.get(env, peer)?;
        let player = object.as_player()?;
        // Without a "stopped" listener nothing would ever end the wait
        if !object.subscribes_to(PLAYER_STOPPED) {
            log::debug!("Player has no stopped listener, stopping synchronously");
            self.engine.stop(player);
            return Ok(());
        }
        let stop = object.stop_coordinator()?;
        stop.request_stop(|| self.engine.stop_async(player));
        Ok(())
    }

    /// Stop playback, returning once the engine reports the player stopped
    #[cfg(not(feature = "async-stop"))]
    pub fn player_stop(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let player = self.get(env, peer)?.as_player()?;
        self.engine.stop(player);
        Ok(())
    }

    /// Replace the player's media; `None` clears it
    pub fn player_set_media(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        media_peer: Option<&H::Peer>,
    ) -> Result<()> {
        let player = self.get(env, peer)?.as_player()?;
        let media = match media_peer {
            Some(media_peer) => Some(self.get(env, media_peer)?.as_media()?),
            None => None,
        };
        self.engine.set_media(player, media);
        Ok(())
    }

    /// Route output to a renderer item; `None` goes back to local output
    pub fn player_set_renderer(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        renderer_peer: Option<&H::Peer>,
    ) -> Result<()> {
        let player = self.get(env, peer)?.as_player()?;
        let renderer = match renderer_peer {
            Some(renderer_peer) => Some(self.get(env, renderer_peer)?.as_renderer()?),
            None => None,
        };
        self.engine.set_renderer(player, renderer)
    }

    pub fn player_rate(&self, env: &H::Env, peer: &H::Peer) -> Result<f32> {
        let player = self.get(env, peer)?.as_player()?;
        Ok(self.engine.rate(player))
    }

    pub fn player_set_rate(&self, env: &H::Env, peer: &H::Peer, rate: f32) -> Result<()> {
        let player = self.get(env, peer)?.as_player()?;
        self.engine.set_rate(player, rate)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn player_update_viewpoint(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        yaw: f32,
        pitch: f32,
        roll: f32,
        field_of_view: f32,
        absolute: bool,
    ) -> Result<()> {
        let object = self.get(env, peer)?;
        let player = object.as_player()?;
        let viewpoint = object.with_viewpoint(|vp| {
            *vp = Viewpoint {
                yaw,
                pitch,
                roll,
                field_of_view,
            };
        })?;
        self.engine.update_viewpoint(player, &viewpoint, absolute)
    }
}
