// In-memory host runtime and engine for tests

use crate::engine::{Engine, EventCallback, EventSource, ListenerId, MediaSource, Viewpoint};
use crate::error::{BridgeError, Result};
use crate::event::{event_type, EventPayload, EventType, NativeEvent};
use crate::handle::{
    DiscovererFlavor, DiscovererHandle, EngineHandle, MediaHandle, NativeHandle, NativeResource,
    PlayerHandle, RawHandle, RendererHandle, ResourceKind,
};
use crate::host::HostRuntime;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

// -----------------------------------------------------------------------------
// Host
// -----------------------------------------------------------------------------

/// Event as received by a peer's entry point
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredEvent {
    pub event_type: EventType,
    pub arg1: i64,
    pub arg2: i64,
    pub argf: f32,
    pub text: Option<String>,
    pub thread: ThreadId,
}

/// Managed peer with a handle field and a recording dispatch entry point
#[derive(Debug)]
pub struct MockPeer {
    handle: AtomicI64,
    events: Mutex<Vec<DeliveredEvent>>,
    delivered: Condvar,
}

impl MockPeer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handle: AtomicI64::new(0),
            events: Mutex::new(Vec::new()),
            delivered: Condvar::new(),
        })
    }

    pub fn handle(&self) -> NativeHandle {
        NativeHandle::from_raw(self.handle.load(Ordering::SeqCst))
    }

    pub fn events(&self) -> Vec<DeliveredEvent> {
        self.events.lock().clone()
    }

    pub fn events_of(&self, event_type: EventType) -> Vec<DeliveredEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Block until at least `count` events arrived or `timeout` passed
    pub fn wait_for_events(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while events.len() < count {
            if self.delivered.wait_until(&mut events, deadline).timed_out() {
                return events.len() >= count;
            }
        }
        true
    }

    fn record(&self, event: DeliveredEvent) {
        self.events.lock().push(event);
        self.delivered.notify_all();
    }
}

/// Per-thread context handed out by [`MockHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockEnv {
    pub thread: ThreadId,
}

/// Host runtime that tracks which threads it knows about
#[derive(Debug, Default)]
pub struct MockHost {
    threads: Mutex<HashSet<ThreadId>>,
    attach_labels: Mutex<Vec<String>>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
    dispatches: AtomicUsize,
    pub fail_attach: AtomicBool,
    pub fail_weak: AtomicBool,
    pub fail_retain: AtomicBool,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the current thread as a host thread and return its context
    pub fn enter(&self) -> MockEnv {
        let thread = thread::current().id();
        self.threads.lock().insert(thread);
        MockEnv { thread }
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    pub fn attach_labels(&self) -> Vec<String> {
        self.attach_labels.lock().clone()
    }

    pub fn is_registered(&self, thread: ThreadId) -> bool {
        self.threads.lock().contains(&thread)
    }
}

impl HostRuntime for MockHost {
    type Env = MockEnv;
    type Peer = Arc<MockPeer>;
    type WeakPeer = Weak<MockPeer>;
    type Strong = Arc<MockPeer>;
    type Retained = Arc<MockPeer>;

    fn current_env(&self) -> Option<MockEnv> {
        let thread = thread::current().id();
        self.threads
            .lock()
            .contains(&thread)
            .then_some(MockEnv { thread })
    }

    fn attach_current_thread(&self, label: &str) -> Result<MockEnv> {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(BridgeError::illegal_state("thread attach refused"));
        }
        let thread = thread::current().id();
        self.threads.lock().insert(thread);
        self.attach_labels.lock().push(label.to_string());
        self.attaches.fetch_add(1, Ordering::SeqCst);
        Ok(MockEnv { thread })
    }

    fn detach_current_thread(&self, env: &MockEnv) {
        self.threads.lock().remove(&env.thread);
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }

    fn load_handle(&self, _env: &MockEnv, peer: &Arc<MockPeer>) -> Result<NativeHandle> {
        Ok(peer.handle())
    }

    fn store_handle(&self, _env: &MockEnv, peer: &Arc<MockPeer>, handle: NativeHandle) -> Result<()> {
        peer.handle.store(handle.as_raw(), Ordering::SeqCst);
        Ok(())
    }

    fn new_weak(&self, _env: &MockEnv, peer: &Arc<MockPeer>) -> Result<Weak<MockPeer>> {
        if self.fail_weak.load(Ordering::SeqCst) {
            return Err(BridgeError::OutOfMemory("weak reference".into()));
        }
        Ok(Arc::downgrade(peer))
    }

    fn upgrade(&self, _env: &MockEnv, weak: &Weak<MockPeer>) -> Option<Arc<MockPeer>> {
        weak.upgrade()
    }

    fn dispatch(
        &self,
        env: &MockEnv,
        target: Arc<MockPeer>,
        payload: &EventPayload,
        text: Option<&str>,
    ) {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        target.record(DeliveredEvent {
            event_type: payload.event_type,
            arg1: payload.arg1,
            arg2: payload.arg2,
            argf: payload.argf,
            text: text.map(str::to_string),
            thread: env.thread,
        });
    }

    fn retain_object(&self, _env: &MockEnv, object: &Arc<MockPeer>) -> Result<Arc<MockPeer>> {
        if self.fail_retain.load(Ordering::SeqCst) {
            return Err(BridgeError::OutOfMemory("global reference".into()));
        }
        Ok(object.clone())
    }

    fn retained_raw(&self, retained: &Arc<MockPeer>) -> usize {
        Arc::as_ptr(retained) as usize
    }
}

// -----------------------------------------------------------------------------
// Engine
// -----------------------------------------------------------------------------

/// Failures the mock engine reports on demand
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub new_instance: bool,
    pub new_media: bool,
    pub new_player: bool,
    pub stop_async: bool,
    pub attach_event: bool,
}

/// Observable state of a simulated player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub media: Option<MediaHandle>,
    pub renderer: Option<RendererHandle>,
    pub window: usize,
    pub playing: bool,
    pub rate: f32,
    pub viewpoint: Option<(Viewpoint, bool)>,
    pub sync_stops: usize,
    pub async_stops: usize,
}

impl PlayerSnapshot {
    fn new(media: Option<MediaHandle>) -> Self {
        Self {
            media,
            renderer: None,
            window: 0,
            playing: false,
            rate: 1.0,
            viewpoint: None,
            sync_stops: 0,
            async_stops: 0,
        }
    }
}

struct Listener {
    event_type: EventType,
    id: ListenerId,
    callback: EventCallback,
}

#[derive(Default)]
struct EngineState {
    refcounts: HashMap<RawHandle, usize>,
    renderer_holds: HashMap<RawHandle, usize>,
    live: HashMap<RawHandle, ResourceKind>,
    freed: HashSet<RawHandle>,
    players: HashMap<RawHandle, PlayerSnapshot>,
    running_discoverers: HashSet<RawHandle>,
    user_agent: Option<(String, String)>,
    last_args: Vec<String>,
}

struct Inner {
    next_raw: AtomicUsize,
    state: Mutex<EngineState>,
    // Held for reading while callbacks run, so detach waits for them
    listeners: RwLock<HashMap<EventSource, Vec<Listener>>>,
    failures: Mutex<Failures>,
    stop_delay: Mutex<Duration>,
    version: Mutex<String>,
}

/// Engine double with refcounts, live resource tracking and event sources
#[derive(Clone)]
pub struct MockEngine {
    inner: Arc<Inner>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_raw: AtomicUsize::new(0x1000),
                state: Mutex::new(EngineState::default()),
                listeners: RwLock::new(HashMap::new()),
                failures: Mutex::new(Failures::default()),
                stop_delay: Mutex::new(Duration::from_millis(20)),
                version: Mutex::new("4.0.0-dev Otto Chriek".to_string()),
            }),
        }
    }

    pub fn set_failures(&self, failures: Failures) {
        *self.inner.failures.lock() = failures;
    }

    pub fn set_stop_delay(&self, delay: Duration) {
        *self.inner.stop_delay.lock() = delay;
    }

    pub fn set_version(&self, version: &str) {
        *self.inner.version.lock() = version.to_string();
    }

    /// Current count on an engine instance, `0` once freed
    pub fn refcount(&self, engine: EngineHandle) -> usize {
        self.inner
            .state
            .lock()
            .refcounts
            .get(&engine.raw())
            .copied()
            .unwrap_or(0)
    }

    pub fn is_freed(&self, raw: RawHandle) -> bool {
        self.inner.state.lock().freed.contains(&raw)
    }

    pub fn is_live(&self, raw: RawHandle) -> bool {
        self.inner.state.lock().live.contains_key(&raw)
    }

    pub fn live_count(&self) -> usize {
        self.inner.state.lock().live.len()
    }

    pub fn player(&self, player: PlayerHandle) -> Option<PlayerSnapshot> {
        self.inner.state.lock().players.get(&player.raw()).cloned()
    }

    pub fn is_discovering(&self, discoverer: DiscovererHandle) -> bool {
        self.inner
            .state
            .lock()
            .running_discoverers
            .contains(&discoverer.raw())
    }

    pub fn user_agent(&self) -> Option<(String, String)> {
        self.inner.state.lock().user_agent.clone()
    }

    pub fn last_args(&self) -> Vec<String> {
        self.inner.state.lock().last_args.clone()
    }

    /// Renderer item as a discoverer would report it
    pub fn discover_renderer_item(&self) -> RawHandle {
        self.allocate()
    }

    pub fn listener_count(&self, source: EventSource) -> usize {
        self.inner
            .listeners
            .read()
            .get(&source)
            .map_or(0, Vec::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.inner.listeners.read().values().map(Vec::len).sum()
    }

    /// Callbacks currently registered on `source`
    pub fn callbacks_for(&self, source: EventSource) -> Vec<EventCallback> {
        self.inner
            .listeners
            .read()
            .get(&source)
            .map(|list| list.iter().map(|l| l.callback.clone()).collect())
            .unwrap_or_default()
    }

    /// Fire `event` on `source` from the calling thread. Returns how many
    /// listeners ran.
    pub fn emit(&self, source: EventSource, event: &NativeEvent) -> usize {
        let listeners = self.inner.listeners.read();
        let Some(list) = listeners.get(&source) else {
            return 0;
        };
        let mut invoked = 0;
        for listener in list.iter().filter(|l| l.event_type == event.event_type) {
            (listener.callback)(event);
            invoked += 1;
        }
        invoked
    }

    fn allocate(&self) -> RawHandle {
        let offset = self.inner.next_raw.fetch_add(0x10, Ordering::Relaxed);
        RawHandle::from(NonZeroUsize::MIN.saturating_add(offset))
    }

    fn track(&self, kind: ResourceKind) -> RawHandle {
        let raw = self.allocate();
        self.inner.state.lock().live.insert(raw, kind);
        raw
    }

    fn free(&self, raw: RawHandle) {
        let mut state = self.inner.state.lock();
        state.live.remove(&raw);
        state.players.remove(&raw);
        state.running_discoverers.remove(&raw);
        state.freed.insert(raw);
    }

    fn failing(&self, pick: impl FnOnce(&Failures) -> bool, what: &str) -> Result<()> {
        if pick(&*self.inner.failures.lock()) {
            Err(BridgeError::Engine(format!("{} failed", what)))
        } else {
            Ok(())
        }
    }

    fn check_engine(&self, engine: EngineHandle) -> Result<()> {
        if self.inner.state.lock().refcounts.contains_key(&engine.raw()) {
            Ok(())
        } else {
            Err(BridgeError::Engine("engine instance already freed".into()))
        }
    }

    fn with_player<R>(&self, player: PlayerHandle, f: impl FnOnce(&mut PlayerSnapshot) -> R) -> Option<R> {
        self.inner.state.lock().players.get_mut(&player.raw()).map(f)
    }

    fn spawn_player(&self, media: Option<MediaHandle>) -> PlayerHandle {
        let raw = self.track(ResourceKind::Player);
        self.inner
            .state
            .lock()
            .players
            .insert(raw, PlayerSnapshot::new(media));
        PlayerHandle::from_raw(raw)
    }
}

/// Drop one count; `true` when it was the last one
fn decrement(counts: &mut HashMap<RawHandle, usize>, raw: RawHandle) -> bool {
    match counts.get(&raw).copied() {
        Some(count) if count > 1 => {
            counts.insert(raw, count - 1);
            false
        }
        Some(_) => {
            counts.remove(&raw);
            true
        }
        None => false,
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn new_instance(&self, args: &[String]) -> Result<EngineHandle> {
        self.failing(|f| f.new_instance, "engine creation")?;
        let raw = self.track(ResourceKind::Engine);
        let mut state = self.inner.state.lock();
        state.refcounts.insert(raw, 1);
        state.last_args = args.to_vec();
        Ok(EngineHandle::from_raw(raw))
    }

    fn retain(&self, engine: EngineHandle) {
        if let Some(count) = self.inner.state.lock().refcounts.get_mut(&engine.raw()) {
            *count += 1;
        }
    }

    fn release(&self, engine: EngineHandle) {
        let freed = {
            let mut state = self.inner.state.lock();
            decrement(&mut state.refcounts, engine.raw())
        };
        if freed {
            self.free(engine.raw());
        }
    }

    fn version(&self) -> String {
        self.inner.version.lock().clone()
    }

    fn compiler(&self) -> String {
        "rustc (mock)".to_string()
    }

    fn changeset(&self) -> String {
        "mock-0000".to_string()
    }

    fn set_user_agent(&self, _engine: EngineHandle, name: &str, http: &str) {
        self.inner.state.lock().user_agent = Some((name.to_string(), http.to_string()));
    }

    fn new_media(&self, engine: EngineHandle, _source: &MediaSource) -> Result<MediaHandle> {
        self.check_engine(engine)?;
        self.failing(|f| f.new_media, "media creation")?;
        Ok(MediaHandle::from_raw(self.track(ResourceKind::Media)))
    }

    fn release_media(&self, media: MediaHandle) {
        self.free(media.raw());
    }

    fn new_player(&self, engine: EngineHandle) -> Result<PlayerHandle> {
        self.check_engine(engine)?;
        self.failing(|f| f.new_player, "player creation")?;
        Ok(self.spawn_player(None))
    }

    fn new_player_from_media(&self, media: MediaHandle) -> Result<PlayerHandle> {
        self.failing(|f| f.new_player, "player creation")?;
        if !self.is_live(media.raw()) {
            return Err(BridgeError::Engine("media already freed".into()));
        }
        Ok(self.spawn_player(Some(media)))
    }

    fn release_player(&self, player: PlayerHandle) {
        self.free(player.raw());
    }

    fn set_output_window(&self, player: PlayerHandle, window: usize) {
        self.with_player(player, |p| p.window = window);
    }

    fn play(&self, player: PlayerHandle) -> Result<()> {
        self.with_player(player, |p| p.playing = true)
            .ok_or_else(|| BridgeError::Engine("no such player".into()))
    }

    fn pause(&self, player: PlayerHandle) {
        self.with_player(player, |p| p.playing = false);
    }

    fn stop(&self, player: PlayerHandle) {
        self.with_player(player, |p| {
            p.playing = false;
            p.sync_stops += 1;
        });
    }

    fn stop_async(&self, player: PlayerHandle) -> Result<()> {
        self.failing(|f| f.stop_async, "stop request")?;
        self.with_player(player, |p| {
            p.playing = false;
            p.async_stops += 1;
        });

        let engine = self.clone();
        let delay = *self.inner.stop_delay.lock();
        thread::Builder::new()
            .name("mock-stop".into())
            .spawn(move || {
                thread::sleep(delay);
                engine.emit(
                    EventSource(player.raw()),
                    &NativeEvent::bare(event_type::PLAYER_STOPPED),
                );
            })
            .map_err(|e| BridgeError::Engine(e.to_string()))?;
        Ok(())
    }

    fn set_media(&self, player: PlayerHandle, media: Option<MediaHandle>) {
        self.with_player(player, |p| p.media = media);
    }

    fn set_renderer(&self, player: PlayerHandle, renderer: Option<RendererHandle>) -> Result<()> {
        self.with_player(player, |p| p.renderer = renderer)
            .ok_or_else(|| BridgeError::Engine("no such player".into()))
    }

    fn rate(&self, player: PlayerHandle) -> f32 {
        self.with_player(player, |p| p.rate).unwrap_or(0.0)
    }

    fn set_rate(&self, player: PlayerHandle, rate: f32) -> Result<()> {
        if rate <= 0.0 {
            return Err(BridgeError::Engine(format!("unsupported rate {}", rate)));
        }
        self.with_player(player, |p| p.rate = rate);
        Ok(())
    }

    fn update_viewpoint(
        &self,
        player: PlayerHandle,
        viewpoint: &Viewpoint,
        absolute: bool,
    ) -> Result<()> {
        self.with_player(player, |p| p.viewpoint = Some((*viewpoint, absolute)));
        Ok(())
    }

    fn hold_renderer(&self, item: RawHandle) -> Result<RendererHandle> {
        let mut state = self.inner.state.lock();
        *state.renderer_holds.entry(item).or_insert(0) += 1;
        state.live.insert(item, ResourceKind::Renderer);
        Ok(RendererHandle::from_raw(item))
    }

    fn release_renderer(&self, renderer: RendererHandle) {
        let last = {
            let mut state = self.inner.state.lock();
            decrement(&mut state.renderer_holds, renderer.raw())
        };
        if last {
            self.free(renderer.raw());
        }
    }

    fn new_discoverer(
        &self,
        engine: EngineHandle,
        _flavor: DiscovererFlavor,
        name: &str,
    ) -> Result<DiscovererHandle> {
        self.check_engine(engine)?;
        if name == "unknown" {
            return Err(BridgeError::Engine(format!("no discovery service '{}'", name)));
        }
        Ok(DiscovererHandle::from_raw(self.track(ResourceKind::Discoverer)))
    }

    fn start_discoverer(&self, discoverer: DiscovererHandle, _flavor: DiscovererFlavor) -> Result<()> {
        self.inner
            .state
            .lock()
            .running_discoverers
            .insert(discoverer.raw());
        Ok(())
    }

    fn stop_discoverer(&self, discoverer: DiscovererHandle, _flavor: DiscovererFlavor) {
        self.inner
            .state
            .lock()
            .running_discoverers
            .remove(&discoverer.raw());
    }

    fn release_discoverer(&self, discoverer: DiscovererHandle, _flavor: DiscovererFlavor) {
        self.free(discoverer.raw());
    }

    fn event_source(&self, resource: NativeResource) -> Option<EventSource> {
        match resource {
            NativeResource::Engine(_) | NativeResource::Renderer(_) => None,
            other => Some(EventSource(other.raw())),
        }
    }

    fn attach_event(
        &self,
        source: EventSource,
        event_type: EventType,
        listener: ListenerId,
        callback: EventCallback,
    ) -> Result<()> {
        self.failing(|f| f.attach_event, "event attach")?;
        self.inner
            .listeners
            .write()
            .entry(source)
            .or_default()
            .push(Listener {
                event_type,
                id: listener,
                callback,
            });
        Ok(())
    }

    fn detach_event(&self, source: EventSource, event_type: EventType, listener: ListenerId) {
        let mut listeners = self.inner.listeners.write();
        if let Some(list) = listeners.get_mut(&source) {
            list.retain(|l| !(l.event_type == event_type && l.id == listener));
            if list.is_empty() {
                listeners.remove(&source);
            }
        }
    }
}
