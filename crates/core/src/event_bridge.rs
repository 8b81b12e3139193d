// Engine event subscriptions and delivery to managed peers

use crate::engine::{Engine, EventCallback, EventSource, ListenerId};
use crate::event::{marshal_text, EventType, NativeEvent, Translator};
use crate::host::HostRuntime;
use crate::peers::{PeerId, WeakPeerTable};
use crate::thread_env::ThreadEnvironmentCache;
use std::sync::Arc;

/// Active registration of one listener on an event source
#[derive(Debug)]
pub struct EventSubscription {
    source: EventSource,
    events: Vec<EventType>,
    listener: ListenerId,
}

impl EventSubscription {
    pub fn events(&self) -> &[EventType] {
        &self.events
    }
}

/// Receiving end of a subscription, invoked on engine threads
pub(crate) struct EventSink<H: HostRuntime> {
    pub(crate) threads: Arc<ThreadEnvironmentCache<H>>,
    pub(crate) host: Arc<H>,
    pub(crate) peers: Arc<WeakPeerTable<H::WeakPeer>>,
    pub(crate) peer: PeerId,
    pub(crate) translator: Translator,
    pub(crate) label: Arc<str>,
}

impl<H: HostRuntime> EventSink<H> {
    fn deliver(&self, event: &NativeEvent) {
        // Translation needs no host context and runs even when the event is
        // dropped, so the stop handshake always completes
        let payload = self.translator.translate(event);

        let Some(env) = self.threads.get_context(&self.label) else {
            log::warn!("Dropping event {:#x}: no host context", event.event_type);
            return;
        };

        let Some(target) = self
            .peers
            .upgrade(self.peer, |weak| self.host.upgrade(&env, weak))
        else {
            return;
        };

        let text = payload.text.as_deref().and_then(marshal_text);
        self.host.dispatch(&env, target, &payload, text);
    }
}

/// Register `sink` for every type in `events`.
///
/// Types the engine refuses are logged and left out of the subscription.
pub(crate) fn subscribe<H: HostRuntime>(
    engine: &dyn Engine,
    source: EventSource,
    events: &[EventType],
    sink: EventSink<H>,
) -> Option<EventSubscription> {
    if events.is_empty() {
        return None;
    }

    let listener = ListenerId::next();
    let sink = Arc::new(sink);
    let callback: EventCallback = Arc::new(move |event: &NativeEvent| sink.deliver(event));

    let mut attached = Vec::with_capacity(events.len());
    for &event_type in events {
        match engine.attach_event(source, event_type, listener, callback.clone()) {
            Ok(()) => attached.push(event_type),
            Err(err) => log::warn!("Failed to attach event {:#x}: {}", event_type, err),
        }
    }
    if attached.is_empty() {
        return None;
    }

    log::debug!(
        "Listener {} attached to {} event types",
        listener.get(),
        attached.len()
    );
    Some(EventSubscription {
        source,
        events: attached,
        listener,
    })
}

/// Unregister every event type and clear the slot. No-op when empty.
///
/// Returns once the engine guarantees the listener will not run again.
pub(crate) fn detach(engine: &dyn Engine, slot: &mut Option<EventSubscription>) {
    let Some(subscription) = slot.take() else {
        return;
    };

    for &event_type in &subscription.events {
        engine.detach_event(subscription.source, event_type, subscription.listener);
    }
    log::debug!("Listener {} detached", subscription.listener.get());
}
