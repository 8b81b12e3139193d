// Bridge objects and the registry that backs native handles

use crate::engine::Viewpoint;
use crate::error::{BridgeError, Result};
use crate::event::EventType;
use crate::event_bridge::EventSubscription;
use crate::handle::{
    DiscovererFlavor, DiscovererHandle, EngineHandle, MediaHandle, NativeHandle, NativeResource,
    PlayerHandle, RendererHandle, ResourceKind,
};
use crate::host::HostRuntime;
use crate::peers::PeerId;
use crate::refcount::EngineRetain;
use crate::stop::SyncStopCoordinator;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Extra state a player carries
pub struct PlayerState<H: HostRuntime> {
    /// Output window, kept alive for as long as the engine may draw into it
    pub(crate) window: H::Retained,
    pub(crate) viewpoint: Option<Viewpoint>,
    pub(crate) stop: Arc<SyncStopCoordinator>,
}

impl<H: HostRuntime> PlayerState<H> {
    pub fn window(&self) -> &H::Retained {
        &self.window
    }

    pub fn viewpoint(&self) -> Option<Viewpoint> {
        self.viewpoint
    }
}

pub enum KindState<H: HostRuntime> {
    Plain,
    Player(PlayerState<H>),
}

/// Everything a bridge object owns besides its handle
pub struct Owner<H: HostRuntime> {
    pub(crate) resource: Option<NativeResource>,
    pub(crate) engine: Option<EngineRetain>,
    pub(crate) peer: Option<PeerId>,
    pub(crate) subscription: Option<EventSubscription>,
    pub(crate) extra: KindState<H>,
}

impl<H: HostRuntime> Owner<H> {
    pub(crate) fn empty() -> Self {
        Self {
            resource: None,
            engine: None,
            peer: None,
            subscription: None,
            extra: KindState::Plain,
        }
    }
}

/// Native-side record behind one managed peer
pub struct BridgeObject<H: HostRuntime> {
    handle: NativeHandle,
    kind: ResourceKind,
    owner: Mutex<Owner<H>>,
}

impl<H: HostRuntime> BridgeObject<H> {
    pub(crate) fn new(handle: NativeHandle, kind: ResourceKind, owner: Owner<H>) -> Self {
        Self {
            handle,
            kind,
            owner: Mutex::new(owner),
        }
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn resource(&self) -> Result<NativeResource> {
        self.owner
            .lock()
            .resource
            .ok_or_else(|| BridgeError::illegal_state("native resource already released"))
    }

    /// Engine handle this object runs on: its own for a root engine, the
    /// retained one for anything derived
    pub fn engine(&self) -> Result<EngineHandle> {
        let owner = self.owner.lock();
        match (&owner.resource, &owner.engine) {
            (_, Some(retain)) => Ok(retain.handle()),
            (Some(NativeResource::Engine(handle)), None) => Ok(*handle),
            _ => Err(BridgeError::illegal_state("object has no engine")),
        }
    }

    /// Own handle of a root engine object. Derived objects are rejected.
    pub fn root_engine(&self) -> Result<EngineHandle> {
        let owner = self.owner.lock();
        match (&owner.resource, &owner.engine) {
            (Some(NativeResource::Engine(handle)), None) => Ok(*handle),
            _ => Err(BridgeError::illegal_state("invalid engine object")),
        }
    }

    pub fn as_media(&self) -> Result<MediaHandle> {
        match self.resource()? {
            NativeResource::Media(handle) => Ok(handle),
            other => Err(wrong_kind(ResourceKind::Media, other)),
        }
    }

    pub fn as_player(&self) -> Result<PlayerHandle> {
        match self.resource()? {
            NativeResource::Player(handle) => Ok(handle),
            other => Err(wrong_kind(ResourceKind::Player, other)),
        }
    }

    pub fn as_renderer(&self) -> Result<RendererHandle> {
        match self.resource()? {
            NativeResource::Renderer(handle) => Ok(handle),
            other => Err(wrong_kind(ResourceKind::Renderer, other)),
        }
    }

    pub fn as_discoverer(&self) -> Result<(DiscovererHandle, DiscovererFlavor)> {
        match self.resource()? {
            NativeResource::Discoverer(handle, flavor) => Ok((handle, flavor)),
            other => Err(wrong_kind(ResourceKind::Discoverer, other)),
        }
    }

    pub(crate) fn stop_coordinator(&self) -> Result<Arc<SyncStopCoordinator>> {
        match &self.owner.lock().extra {
            KindState::Player(state) => Ok(state.stop.clone()),
            KindState::Plain => Err(BridgeError::illegal_state("not a player")),
        }
    }

    /// Update the cached viewpoint, creating it on first use
    pub(crate) fn with_viewpoint(&self, update: impl FnOnce(&mut Viewpoint)) -> Result<Viewpoint> {
        match &mut self.owner.lock().extra {
            KindState::Player(state) => {
                let viewpoint = state.viewpoint.get_or_insert_with(Viewpoint::default);
                update(viewpoint);
                Ok(*viewpoint)
            }
            KindState::Plain => Err(BridgeError::illegal_state("not a player")),
        }
    }

    pub fn has_subscription(&self) -> bool {
        self.owner.lock().subscription.is_some()
    }

    /// Whether the live subscription carries `event_type`
    pub fn subscribes_to(&self, event_type: EventType) -> bool {
        self.owner
            .lock()
            .subscription
            .as_ref()
            .is_some_and(|s| s.events().contains(&event_type))
    }

    pub(crate) fn take_subscription(&self) -> Option<EventSubscription> {
        self.owner.lock().subscription.take()
    }

    /// Move the owned state out, leaving an empty record behind
    pub(crate) fn take_owner(&self) -> Owner<H> {
        std::mem::replace(&mut *self.owner.lock(), Owner::empty())
    }
}

fn wrong_kind(expected: ResourceKind, actual: NativeResource) -> BridgeError {
    BridgeError::illegal_state(format!(
        "expected a {} object, got a {} object",
        expected,
        actual.kind()
    ))
}

/// Live bridge objects keyed by the handle stored on their peers
pub struct ObjectRegistry<H: HostRuntime> {
    objects: Mutex<HashMap<i64, Arc<BridgeObject<H>>>>,
    next_id: AtomicI64,
}

impl<H: HostRuntime> ObjectRegistry<H> {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub(crate) fn allocate_handle(&self) -> NativeHandle {
        NativeHandle::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, object: Arc<BridgeObject<H>>) {
        self.objects.lock().insert(object.handle().as_raw(), object);
    }

    pub fn get(&self, handle: NativeHandle) -> Option<Arc<BridgeObject<H>>> {
        self.objects.lock().get(&handle.as_raw()).cloned()
    }

    pub(crate) fn remove(&self, handle: NativeHandle) -> Option<Arc<BridgeObject<H>>> {
        self.objects.lock().remove(&handle.as_raw())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: HostRuntime> Default for ObjectRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
