// Event delivery from native threads to managed peers

mod common;

use common::Fixture;
use mediabridge_core::event_type::*;
use mediabridge_core::testing::{Failures, MockPeer};
use mediabridge_core::{DiscovererFlavor, EventData, EventSource, NativeEvent, RawHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn source_of(fx: &Fixture, peer: &Arc<MockPeer>) -> EventSource {
    EventSource(fx.bridge.get(&fx.env, peer).unwrap().resource().unwrap().raw())
}

#[test]
fn test_event_from_native_thread_is_delivered() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);

    let engine = fx.engine.clone();
    let worker = thread::spawn(move || {
        engine.emit(
            source,
            &NativeEvent::new(PLAYER_TIME_CHANGED, EventData::TimeChanged { time_ms: 1234 }),
        );
        thread::current().id()
    });
    let worker_id = worker.join().unwrap();

    let delivered = player.events_of(PLAYER_TIME_CHANGED);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].arg1, 1234);
    assert_eq!(delivered[0].thread, worker_id);
    assert_eq!(fx.host.attach_labels(), vec!["test-events".to_string()]);
}

#[test]
fn test_native_thread_attached_once_and_detached_on_exit() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);

    let engine = fx.engine.clone();
    thread::spawn(move || {
        for position in 0..5 {
            engine.emit(
                source,
                &NativeEvent::new(
                    PLAYER_POSITION_CHANGED,
                    EventData::PositionChanged {
                        position: position as f32 / 10.0,
                    },
                ),
            );
        }
    })
    .join()
    .unwrap();

    assert_eq!(player.events_of(PLAYER_POSITION_CHANGED).len(), 5);
    assert_eq!(fx.host.attach_count(), 1);
    assert_eq!(fx.host.detach_count(), 1);
}

#[test]
fn test_host_thread_is_not_attached() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);
    let source = source_of(&fx, &media);

    fx.engine.emit(
        source,
        &NativeEvent::new(
            MEDIA_DURATION_CHANGED,
            EventData::MediaDurationChanged {
                duration_ms: 90_000,
            },
        ),
    );
    fx.engine.emit(
        source,
        &NativeEvent::new(MEDIA_PARSED_CHANGED, EventData::MediaParsedChanged { status: 4 }),
    );

    let events = media.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].arg1, 90_000);
    assert_eq!(events[1].arg1, 4);
    assert_eq!(events[0].thread, fx.env.thread);
    assert_eq!(fx.host.attach_count(), 0);
}

#[test]
fn test_collected_peer_discards_events() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);
    let source = source_of(&fx, &media);

    drop(media);
    let invoked = fx.engine.emit(
        source,
        &NativeEvent::new(MEDIA_STATE_CHANGED, EventData::MediaStateChanged { state: 3 }),
    );

    assert_eq!(invoked, 1);
    assert_eq!(fx.host.dispatch_count(), 0);
}

#[test]
fn test_release_detaches_all_event_types() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);

    assert_eq!(fx.engine.listener_count(source), 18);
    assert!(fx.bridge.get(&fx.env, &player).unwrap().has_subscription());

    fx.bridge.player_release(&fx.env, &player).unwrap();
    assert_eq!(fx.engine.listener_count(source), 0);
    assert_eq!(fx.engine.emit(source, &NativeEvent::bare(PLAYER_PLAYING)), 0);
}

#[test]
fn test_callback_after_release_is_dropped() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);
    let callbacks = fx.engine.callbacks_for(source);
    assert!(!callbacks.is_empty());

    fx.bridge.player_release(&fx.env, &player).unwrap();
    (callbacks[0])(&NativeEvent::bare(PLAYER_PLAYING));

    assert!(player.events().is_empty());
}

#[test]
fn test_detach_events_is_idempotent() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);
    let source = source_of(&fx, &media);
    assert_eq!(fx.engine.listener_count(source), 6);

    fx.bridge.detach_events(&fx.env, &media).unwrap();
    fx.bridge.detach_events(&fx.env, &media).unwrap();
    assert_eq!(fx.engine.listener_count(source), 0);
    assert!(!fx.bridge.get(&fx.env, &media).unwrap().has_subscription());

    // Release still works after an explicit detach
    fx.bridge.media_release(&fx.env, &media).unwrap();
}

#[test]
fn test_malformed_text_is_delivered_as_null() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);

    fx.engine.emit(
        source,
        &NativeEvent::new(
            PLAYER_RECORD_CHANGED,
            EventData::RecordChanged {
                recording: true,
                file_path: Some(vec![b'a', 0xE2, 0x00]),
            },
        ),
    );
    fx.engine.emit(
        source,
        &NativeEvent::new(
            PLAYER_RECORD_CHANGED,
            EventData::RecordChanged {
                recording: false,
                file_path: Some(b"/tmp/rec.ts\0junk".to_vec()),
            },
        ),
    );

    let events = player.events_of(PLAYER_RECORD_CHANGED);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].arg1, 1);
    assert_eq!(events[0].text, None);
    assert_eq!(events[1].arg1, 0);
    assert_eq!(events[1].text.as_deref(), Some("/tmp/rec.ts"));
}

#[test]
fn test_attach_failure_drops_event() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);
    fx.host.fail_attach.store(true, Ordering::SeqCst);

    let engine = fx.engine.clone();
    thread::spawn(move || {
        engine.emit(source, &NativeEvent::bare(PLAYER_OPENING));
    })
    .join()
    .unwrap();

    assert!(player.events().is_empty());
    assert_eq!(fx.host.attach_count(), 0);
    assert_eq!(fx.host.detach_count(), 0);
}

#[test]
fn test_refused_event_types_leave_object_usable() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    fx.engine.set_failures(Failures {
        attach_event: true,
        ..Failures::default()
    });

    let media = fx.media_peer(&engine_peer);
    assert!(!fx.bridge.get(&fx.env, &media).unwrap().has_subscription());
    assert_eq!(fx.engine.total_listeners(), 0);
    fx.bridge.media_release(&fx.env, &media).unwrap();
}

#[test]
fn test_renderer_discoverer_reports_items() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let discoverer = MockPeer::new();
    fx.bridge
        .discoverer_new(
            &fx.env,
            &discoverer,
            &engine_peer,
            DiscovererFlavor::Renderer,
            Some("microdns_renderer"),
        )
        .unwrap();
    let source = source_of(&fx, &discoverer);
    assert_eq!(fx.engine.listener_count(source), 2);

    let item = fx.engine.discover_renderer_item();
    fx.engine.emit(
        source,
        &NativeEvent::new(
            RENDERER_DISCOVERER_ITEM_ADDED,
            EventData::RendererItem {
                item: mediabridge_core::RendererHandle::from_raw(item),
                name: Some(b"Living Room".to_vec()),
            },
        ),
    );

    let added = discoverer.events_of(RENDERER_DISCOVERER_ITEM_ADDED);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].text.as_deref(), Some("Living Room"));

    // The host wraps the reported item
    let renderer = MockPeer::new();
    fx.bridge
        .renderer_new(&fx.env, &renderer, &engine_peer, added[0].arg1 as usize)
        .unwrap();
    assert_eq!(
        fx.bridge.get(&fx.env, &renderer).unwrap().as_renderer().unwrap().raw(),
        RawHandle::new(added[0].arg1 as usize).unwrap()
    );
    assert_eq!(fx.engine.refcount(engine), 3);
}

#[test]
fn test_release_with_events_in_flight() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let source = source_of(&fx, &player);

    let running = Arc::new(AtomicBool::new(true));
    let engine = fx.engine.clone();
    let flag = running.clone();
    let worker = thread::spawn(move || {
        let mut time_ms = 0;
        while flag.load(Ordering::SeqCst) {
            engine.emit(
                source,
                &NativeEvent::new(PLAYER_TIME_CHANGED, EventData::TimeChanged { time_ms }),
            );
            time_ms += 1;
        }
    });

    assert!(player.wait_for_events(1, Duration::from_secs(5)));
    fx.bridge.player_release(&fx.env, &player).unwrap();
    let delivered = player.events().len();

    thread::sleep(Duration::from_millis(20));
    running.store(false, Ordering::SeqCst);
    worker.join().unwrap();

    assert_eq!(player.events().len(), delivered);
    assert_eq!(fx.engine.listener_count(source), 0);
    assert_eq!(fx.host.detach_count(), fx.host.attach_count());
}
