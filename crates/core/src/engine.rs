// Contract the wrapped native engine has to fulfil

use crate::error::Result;
use crate::event::{EventType, NativeEvent};
use crate::handle::{
    DiscovererFlavor, DiscovererHandle, EngineHandle, MediaHandle, NativeResource, PlayerHandle,
    RawHandle, RendererHandle,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-resource event publication point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSource(pub RawHandle);

/// Identifies one listener registration on an event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

impl ListenerId {
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Listener invoked by the engine, on any of its threads
pub type EventCallback = Arc<dyn Fn(&NativeEvent) + Send + Sync>;

/// Where a media item comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// MRL such as `http://...` or `file:///...`
    Location(String),
    Path(PathBuf),
}

/// 360° view orientation, in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewpoint {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub field_of_view: f32,
}

/// Native multimedia engine.
///
/// Implementations wrap the real library. The bridge never interprets engine
/// failures; they surface as [`BridgeError::Engine`](crate::BridgeError::Engine).
pub trait Engine: Send + Sync + 'static {
    // Instance

    fn new_instance(&self, args: &[String]) -> Result<EngineHandle>;
    /// Increment the engine's own reference counter
    fn retain(&self, engine: EngineHandle);
    /// Decrement the counter, freeing the engine when it reaches zero
    fn release(&self, engine: EngineHandle);
    fn version(&self) -> String;
    fn compiler(&self) -> String;
    fn changeset(&self) -> String;
    fn set_user_agent(&self, engine: EngineHandle, name: &str, http: &str);

    // Media

    fn new_media(&self, engine: EngineHandle, source: &MediaSource) -> Result<MediaHandle>;
    fn release_media(&self, media: MediaHandle);

    // Player

    fn new_player(&self, engine: EngineHandle) -> Result<PlayerHandle>;
    fn new_player_from_media(&self, media: MediaHandle) -> Result<PlayerHandle>;
    fn release_player(&self, player: PlayerHandle);
    /// Hand the retained host window to the player's video output
    fn set_output_window(&self, player: PlayerHandle, window: usize);
    fn play(&self, player: PlayerHandle) -> Result<()>;
    fn pause(&self, player: PlayerHandle);
    /// Blocking stop of older engine generations
    fn stop(&self, player: PlayerHandle);
    /// Enqueue a stop; completion is announced by a "stopped" event
    fn stop_async(&self, player: PlayerHandle) -> Result<()>;
    fn set_media(&self, player: PlayerHandle, media: Option<MediaHandle>);
    fn set_renderer(&self, player: PlayerHandle, renderer: Option<RendererHandle>) -> Result<()>;
    fn rate(&self, player: PlayerHandle) -> f32;
    fn set_rate(&self, player: PlayerHandle, rate: f32) -> Result<()>;
    fn update_viewpoint(
        &self,
        player: PlayerHandle,
        viewpoint: &Viewpoint,
        absolute: bool,
    ) -> Result<()>;

    // Renderer items

    /// Take a reference on a renderer item reported by a discoverer
    fn hold_renderer(&self, item: RawHandle) -> Result<RendererHandle>;
    fn release_renderer(&self, renderer: RendererHandle);

    // Discoverers

    fn new_discoverer(
        &self,
        engine: EngineHandle,
        flavor: DiscovererFlavor,
        name: &str,
    ) -> Result<DiscovererHandle>;
    fn start_discoverer(&self, discoverer: DiscovererHandle, flavor: DiscovererFlavor)
        -> Result<()>;
    fn stop_discoverer(&self, discoverer: DiscovererHandle, flavor: DiscovererFlavor);
    fn release_discoverer(&self, discoverer: DiscovererHandle, flavor: DiscovererFlavor);

    // Events

    /// Event source of a resource, if its kind publishes events
    fn event_source(&self, resource: NativeResource) -> Option<EventSource>;
    fn attach_event(
        &self,
        source: EventSource,
        event_type: EventType,
        listener: ListenerId,
        callback: EventCallback,
    ) -> Result<()>;
    /// Once this returns the listener is never invoked again
    fn detach_event(&self, source: EventSource, event_type: EventType, listener: ListenerId);
}

/// Release a native resource through the kind-specific engine call
pub(crate) fn release_native(engine: &dyn Engine, resource: NativeResource) {
    match resource {
        NativeResource::Engine(handle) => engine.release(handle),
        NativeResource::Media(handle) => engine.release_media(handle),
        NativeResource::Player(handle) => engine.release_player(handle),
        NativeResource::Renderer(handle) => engine.release_renderer(handle),
        NativeResource::Discoverer(handle, flavor) => engine.release_discoverer(handle, flavor),
    }
}
