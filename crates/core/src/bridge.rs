// Bridge context: object lifecycle and event wiring

use crate::config::BridgeConfig;
use crate::engine::{release_native, Engine};
use crate::error::{BridgeError, Result};
use crate::event::{EventType, Translator};
use crate::event_bridge::{self, EventSink};
use crate::handle::{EngineHandle, NativeHandle, ResourceKind};
use crate::host::HostRuntime;
use crate::object::{BridgeObject, KindState, ObjectRegistry, Owner};
use crate::peers::WeakPeerTable;
use crate::refcount::EngineRetain;
use crate::thread_env::ThreadEnvironmentCache;
use std::sync::Arc;

/// Process-wide bridge state.
///
/// Created once before the first bridge object and torn down after the
/// last one is released.
pub struct Bridge<H: HostRuntime> {
    pub(crate) host: Arc<H>,
    pub(crate) engine: Arc<dyn Engine>,
    threads: Arc<ThreadEnvironmentCache<H>>,
    peers: Arc<WeakPeerTable<H::WeakPeer>>,
    objects: ObjectRegistry<H>,
    label: Arc<str>,
}

impl<H: HostRuntime> Bridge<H> {
    pub fn init(host: Arc<H>, engine: Arc<dyn Engine>, config: BridgeConfig) -> Self {
        log::info!(
            "Bridge initialized, event threads labelled '{}'",
            config.event_thread_label
        );
        Self {
            threads: Arc::new(ThreadEnvironmentCache::new(host.clone())),
            host,
            engine,
            peers: Arc::new(WeakPeerTable::new()),
            objects: ObjectRegistry::new(),
            label: Arc::from(config.event_thread_label),
        }
    }

    /// Fails while bridge objects are still alive
    pub fn teardown(&self) -> Result<()> {
        let live = self.objects.len();
        if live > 0 {
            return Err(BridgeError::illegal_state(format!(
                "{} bridge objects still alive",
                live
            )));
        }
        log::info!("Bridge torn down");
        Ok(())
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Create a bridge object and bind it to `peer`.
    ///
    /// A derived object (`parent` set) retains the engine and registers a weak
    /// reference to its peer before `build` runs. The handle is published into
    /// the peer last; any failure rolls back through the release path.
    pub(crate) fn create<F>(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        kind: ResourceKind,
        parent: Option<EngineHandle>,
        build: F,
    ) -> Result<NativeHandle>
    where
        F: FnOnce(&mut Owner<H>) -> Result<()>,
    {
        if self.host.load_handle(env, peer)?.is_bound() {
            return Err(BridgeError::illegal_state("native object already initialized"));
        }

        let mut owner = Owner::empty();
        if let Err(err) = self.populate(env, peer, parent, &mut owner, build) {
            log::warn!("Failed to create {} object: {}", kind, err);
            self.dismantle(owner);
            return Err(err);
        }

        let handle = self.objects.allocate_handle();
        let object = Arc::new(BridgeObject::new(handle, kind, owner));
        self.objects.insert(object.clone());

        if let Err(err) = self.host.store_handle(env, peer, handle) {
            log::warn!("Failed to bind {} object to its peer: {}", kind, err);
            self.objects.remove(handle);
            self.dismantle(object.take_owner());
            return Err(err);
        }

        log::info!("Created {} object {}", kind, handle.as_raw());
        Ok(handle)
    }

    fn populate<F>(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        parent: Option<EngineHandle>,
        owner: &mut Owner<H>,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Owner<H>) -> Result<()>,
    {
        if let Some(engine) = parent {
            owner.engine = Some(EngineRetain::acquire(self.engine.clone(), engine));
            let weak = self.host.new_weak(env, peer)?;
            owner.peer = Some(self.peers.insert(weak));
        }
        build(owner)
    }

    /// Tear down everything an owner holds, in dependency order
    fn dismantle(&self, mut owner: Owner<H>) {
        // No callback may run once the resource is gone
        event_bridge::detach(&*self.engine, &mut owner.subscription);

        if let Some(resource) = owner.resource.take() {
            release_native(&*self.engine, resource);
        }
        if let KindState::Player(state) = &owner.extra {
            state.stop.on_stopped_event();
        }
        owner.extra = KindState::Plain;

        if let Some(peer) = owner.peer.take() {
            self.peers.remove(peer);
        }
        drop(owner.engine.take());
    }

    /// Resolve the bridge object bound to `peer`
    pub fn get(&self, env: &H::Env, peer: &H::Peer) -> Result<Arc<BridgeObject<H>>> {
        let handle = self.host.load_handle(env, peer)?;
        if !handle.is_bound() {
            return Err(BridgeError::illegal_state(
                "can't get native object: not initialized or already released",
            ));
        }
        self.objects
            .get(handle)
            .ok_or_else(|| BridgeError::illegal_state("stale native handle"))
    }

    /// Release the object bound to `peer` and unbind the peer
    pub fn release(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let object = self.get(env, peer)?;
        self.objects.remove(object.handle());
        self.dismantle(object.take_owner());
        self.host.store_handle(env, peer, NativeHandle::UNBOUND)?;
        log::info!("Released {} object {}", object.kind(), object.handle().as_raw());
        Ok(())
    }

    /// Subscribe the object under construction to its resource's events
    pub(crate) fn attach_events(
        &self,
        owner: &mut Owner<H>,
        translator: Translator,
        events: &[EventType],
    ) {
        if owner.subscription.is_some() {
            return;
        }
        let (Some(resource), Some(peer)) = (owner.resource, owner.peer) else {
            return;
        };
        let Some(source) = self.engine.event_source(resource) else {
            return;
        };

        let sink = EventSink {
            threads: self.threads.clone(),
            host: self.host.clone(),
            peers: self.peers.clone(),
            peer,
            translator,
            label: self.label.clone(),
        };
        owner.subscription = event_bridge::subscribe(&*self.engine, source, events, sink);
    }

    /// Drop the event subscription of the object bound to `peer`.
    /// Safe to call repeatedly.
    pub fn detach_events(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        let object = self.get(env, peer)?;
        let mut subscription = object.take_subscription();
        event_bridge::detach(&*self.engine, &mut subscription);
        // A stop still waiting on the event path can no longer be signalled
        if let Ok(stop) = object.stop_coordinator() {
            stop.on_stopped_event();
        }
        Ok(())
    }

    /// Engine handle of a root engine peer
    pub(crate) fn parent_engine(&self, env: &H::Env, engine_peer: &H::Peer) -> Result<EngineHandle> {
        self.get(env, engine_peer)?.root_engine()
    }
}
