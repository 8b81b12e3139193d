// Contract the managed host runtime has to fulfil

use crate::error::Result;
use crate::event::EventPayload;
use crate::handle::NativeHandle;

/// Managed, garbage-collected runtime that owns the peer objects.
///
/// `Env` is the per-thread call context. It is only valid on the thread that
/// produced it and is never sent elsewhere.
pub trait HostRuntime: Send + Sync + 'static {
    /// Per-thread call context
    type Env: Clone + 'static;
    /// Managed peer as seen from a downward call
    type Peer;
    /// Non-owning reference to a peer; may be cleared by the collector
    type WeakPeer: Send + Sync + 'static;
    /// Transient strong reference produced by upgrading a weak one
    type Strong;
    /// Long-lived reference to an arbitrary host object (output window)
    type Retained: Send + 'static;

    /// Context of the current thread if the runtime already knows it
    fn current_env(&self) -> Option<Self::Env>;
    /// Register the current thread under `label`
    fn attach_current_thread(&self, label: &str) -> Result<Self::Env>;
    /// Undo [`attach_current_thread`](Self::attach_current_thread). Runs
    /// during thread teardown with the context the attach produced.
    fn detach_current_thread(&self, env: &Self::Env);

    fn load_handle(&self, env: &Self::Env, peer: &Self::Peer) -> Result<NativeHandle>;
    fn store_handle(&self, env: &Self::Env, peer: &Self::Peer, handle: NativeHandle)
        -> Result<()>;

    fn new_weak(&self, env: &Self::Env, peer: &Self::Peer) -> Result<Self::WeakPeer>;
    /// `None` once the peer has been collected
    fn upgrade(&self, env: &Self::Env, weak: &Self::WeakPeer) -> Option<Self::Strong>;

    /// Invoke the peer's upward entry point.
    ///
    /// Consumes `target` so transient references are released when the call
    /// returns. Handler failures are swallowed by the host.
    fn dispatch(
        &self,
        env: &Self::Env,
        target: Self::Strong,
        payload: &EventPayload,
        text: Option<&str>,
    );

    fn retain_object(&self, env: &Self::Env, object: &Self::Peer) -> Result<Self::Retained>;
    /// Pointer value of a retained object, as handed to the engine
    fn retained_raw(&self, retained: &Self::Retained) -> usize;
}
