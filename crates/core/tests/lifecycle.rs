// Object creation, release and rollback across the bridge

mod common;

use common::Fixture;
use mediabridge_core::testing::{Failures, MockPeer};
use mediabridge_core::{BridgeError, DiscovererFlavor, MediaSource};
use std::sync::atomic::Ordering;

#[test]
fn test_create_get_release() {
    let fx = Fixture::new();
    let (peer, engine) = fx.engine_peer();

    assert!(peer.handle().is_bound());
    assert_eq!(fx.bridge.live_objects(), 1);
    assert_eq!(fx.engine.last_args(), vec!["-vv".to_string()]);

    let object = fx.bridge.get(&fx.env, &peer).unwrap();
    assert_eq!(object.handle(), peer.handle());

    fx.bridge.engine_release(&fx.env, &peer).unwrap();
    assert!(!peer.handle().is_bound());
    assert!(fx.engine.is_freed(engine.raw()));
    assert!(matches!(
        fx.bridge.get(&fx.env, &peer),
        Err(BridgeError::IllegalState(_))
    ));
}

#[test]
fn test_double_release_is_illegal_state() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);

    fx.bridge.media_release(&fx.env, &media).unwrap();
    let live = fx.engine.live_count();

    let err = fx.bridge.media_release(&fx.env, &media).unwrap_err();
    assert!(matches!(err, BridgeError::IllegalState(_)));
    assert_eq!(fx.engine.live_count(), live);
}

#[test]
fn test_create_on_bound_peer_fails() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);
    let handle = media.handle();
    assert_eq!(fx.engine.refcount(engine), 2);

    let err = fx
        .bridge
        .media_new(
            &fx.env,
            &media,
            &engine_peer,
            &MediaSource::Location("file:///sdcard/b.mkv".into()),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalState(_)));
    assert_eq!(media.handle(), handle);
    assert_eq!(fx.engine.refcount(engine), 2);
}

#[test]
fn test_engine_refcount_balance() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    assert_eq!(fx.engine.refcount(engine), 1);

    let media = fx.media_peer(&engine_peer);
    assert_eq!(fx.engine.refcount(engine), 2);

    let (player, _window) = fx.player_peer(&engine_peer);
    assert_eq!(fx.engine.refcount(engine), 3);

    fx.bridge.player_release(&fx.env, &player).unwrap();
    assert_eq!(fx.engine.refcount(engine), 2);

    fx.bridge.media_release(&fx.env, &media).unwrap();
    assert_eq!(fx.engine.refcount(engine), 1);

    fx.bridge.engine_release(&fx.env, &engine_peer).unwrap();
    assert!(fx.engine.is_freed(engine.raw()));
    assert_eq!(fx.engine.live_count(), 0);
    assert_eq!(fx.bridge.live_objects(), 0);
}

#[test]
fn test_root_released_before_derived_objects() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);

    fx.bridge.engine_release(&fx.env, &engine_peer).unwrap();
    assert!(!fx.engine.is_freed(engine.raw()));
    assert_eq!(fx.engine.refcount(engine), 1);

    fx.bridge.media_release(&fx.env, &media).unwrap();
    assert!(fx.engine.is_freed(engine.raw()));
}

#[test]
fn test_player_from_media_inherits_engine() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);
    let media_handle = fx.bridge.get(&fx.env, &media).unwrap().as_media().unwrap();

    let player = MockPeer::new();
    let window = MockPeer::new();
    fx.bridge
        .player_new_from_media(&fx.env, &player, &media, &window)
        .unwrap();
    assert_eq!(fx.engine.refcount(engine), 3);

    let object = fx.bridge.get(&fx.env, &player).unwrap();
    assert_eq!(object.engine().unwrap(), engine);
    let snapshot = fx.engine.player(object.as_player().unwrap()).unwrap();
    assert_eq!(snapshot.media, Some(media_handle));
    assert_eq!(snapshot.window, std::sync::Arc::as_ptr(&window) as usize);
}

#[test]
fn test_weak_reference_failure_rolls_back() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let live = fx.engine.live_count();

    fx.host.fail_weak.store(true, Ordering::SeqCst);
    let media = MockPeer::new();
    let err = fx
        .bridge
        .media_new(
            &fx.env,
            &media,
            &engine_peer,
            &MediaSource::Location("http://example.com/c.mp3".into()),
        )
        .unwrap_err();

    assert!(matches!(err, BridgeError::OutOfMemory(_)));
    assert!(!media.handle().is_bound());
    assert_eq!(fx.engine.refcount(engine), 1);
    assert_eq!(fx.engine.live_count(), live);
    assert_eq!(fx.bridge.live_objects(), 1);
}

#[test]
fn test_engine_failure_rolls_back() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    fx.engine.set_failures(Failures {
        new_player: true,
        ..Failures::default()
    });

    let player = MockPeer::new();
    let window = MockPeer::new();
    let err = fx
        .bridge
        .player_new(&fx.env, &player, &engine_peer, &window)
        .unwrap_err();

    assert!(matches!(err, BridgeError::Engine(_)));
    assert!(!player.handle().is_bound());
    assert_eq!(fx.engine.refcount(engine), 1);
    assert_eq!(fx.engine.total_listeners(), 0);
}

#[test]
fn test_window_retain_failure_releases_player() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let live = fx.engine.live_count();

    fx.host.fail_retain.store(true, Ordering::SeqCst);
    let player = MockPeer::new();
    let window = MockPeer::new();
    let err = fx
        .bridge
        .player_new(&fx.env, &player, &engine_peer, &window)
        .unwrap_err();

    assert!(matches!(err, BridgeError::OutOfMemory(_)));
    assert!(!player.handle().is_bound());
    assert_eq!(fx.engine.refcount(engine), 1);
    assert_eq!(fx.engine.live_count(), live);
    assert_eq!(fx.engine.total_listeners(), 0);
}

#[test]
fn test_parent_must_be_root_engine() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let media = fx.media_peer(&engine_peer);

    let err = fx
        .bridge
        .media_new(
            &fx.env,
            &MockPeer::new(),
            &media,
            &MediaSource::Location("http://example.com/d.ogg".into()),
        )
        .unwrap_err();
    assert_eq!(err, BridgeError::illegal_state("invalid engine object"));

    let unbound = MockPeer::new();
    let err = fx
        .bridge
        .player_new(&fx.env, &MockPeer::new(), &unbound, &MockPeer::new())
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalState(_)));
}

#[test]
fn test_empty_media_source_is_rejected() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();
    let media = MockPeer::new();

    let err = fx
        .bridge
        .media_new(&fx.env, &media, &engine_peer, &MediaSource::Location(String::new()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalArgument(_)));

    let err = fx
        .bridge
        .media_new(&fx.env, &media, &engine_peer, &MediaSource::Path("".into()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalArgument(_)));
    assert_eq!(fx.engine.refcount(engine), 1);
}

#[test]
fn test_teardown_requires_no_live_objects() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();

    assert!(matches!(
        fx.bridge.teardown(),
        Err(BridgeError::IllegalState(_))
    ));
    fx.bridge.engine_release(&fx.env, &engine_peer).unwrap();
    assert!(fx.bridge.teardown().is_ok());
}

#[test]
fn test_engine_information() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();

    assert_eq!(fx.bridge.engine_version(), "4.0.0-dev Otto Chriek");
    assert_eq!(fx.bridge.engine_major_version(), 4);
    assert!(!fx.bridge.engine_compiler().is_empty());
    assert!(!fx.bridge.engine_changeset().is_empty());
    assert_eq!(
        fx.bridge.engine_instance(&fx.env, &engine_peer).unwrap(),
        engine.raw().get()
    );

    fx.engine.set_version("3.0.20 Vetinari");
    assert_eq!(fx.bridge.engine_major_version(), 3);
}

#[test]
fn test_set_user_agent() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();

    let err = fx
        .bridge
        .engine_set_user_agent(&fx.env, &engine_peer, Some("App"), None)
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalArgument(_)));
    assert!(fx.engine.user_agent().is_none());

    fx.bridge
        .engine_set_user_agent(&fx.env, &engine_peer, Some("App 1.0"), Some("App/1.0"))
        .unwrap();
    assert_eq!(
        fx.engine.user_agent(),
        Some(("App 1.0".to_string(), "App/1.0".to_string()))
    );

    // Peer is resolved before arguments are checked
    let unbound = MockPeer::new();
    let err = fx
        .bridge
        .engine_set_user_agent(&fx.env, &unbound, None, None)
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalState(_)));
}

#[test]
fn test_player_operations() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let media = fx.media_peer(&engine_peer);
    let handle = fx.bridge.get(&fx.env, &player).unwrap().as_player().unwrap();

    fx.bridge.player_set_media(&fx.env, &player, Some(&media)).unwrap();
    fx.bridge.player_play(&fx.env, &player).unwrap();
    let snapshot = fx.engine.player(handle).unwrap();
    assert!(snapshot.playing);
    assert!(snapshot.media.is_some());

    fx.bridge.player_pause(&fx.env, &player).unwrap();
    assert!(!fx.engine.player(handle).unwrap().playing);

    fx.bridge.player_set_rate(&fx.env, &player, 1.5).unwrap();
    assert_eq!(fx.bridge.player_rate(&fx.env, &player).unwrap(), 1.5);
    assert!(matches!(
        fx.bridge.player_set_rate(&fx.env, &player, 0.0),
        Err(BridgeError::Engine(_))
    ));

    fx.bridge.player_set_media(&fx.env, &player, None).unwrap();
    assert!(fx.engine.player(handle).unwrap().media.is_none());

    // A media peer is not a player
    assert!(matches!(
        fx.bridge.player_play(&fx.env, &media),
        Err(BridgeError::IllegalState(_))
    ));
}

#[test]
fn test_viewpoint_is_cached_per_player() {
    let fx = Fixture::new();
    let (engine_peer, _) = fx.engine_peer();
    let (player, _window) = fx.player_peer(&engine_peer);
    let handle = fx.bridge.get(&fx.env, &player).unwrap().as_player().unwrap();

    fx.bridge
        .player_update_viewpoint(&fx.env, &player, 90.0, 10.0, 0.0, 80.0, true)
        .unwrap();
    let (viewpoint, absolute) = fx.engine.player(handle).unwrap().viewpoint.unwrap();
    assert_eq!(viewpoint.yaw, 90.0);
    assert_eq!(viewpoint.field_of_view, 80.0);
    assert!(absolute);

    fx.bridge
        .player_update_viewpoint(&fx.env, &player, 5.0, 0.0, 0.0, 0.0, false)
        .unwrap();
    let (viewpoint, absolute) = fx.engine.player(handle).unwrap().viewpoint.unwrap();
    assert_eq!(viewpoint.yaw, 5.0);
    assert!(!absolute);
}

#[test]
fn test_discoverer_lifecycle() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();

    let missing = MockPeer::new();
    for name in [None, Some("")] {
        let err = fx
            .bridge
            .discoverer_new(&fx.env, &missing, &engine_peer, DiscovererFlavor::Media, name)
            .unwrap_err();
        assert!(matches!(err, BridgeError::IllegalArgument(_)));
    }

    let err = fx
        .bridge
        .discoverer_new(
            &fx.env,
            &missing,
            &engine_peer,
            DiscovererFlavor::Media,
            Some("unknown"),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::Engine(_)));
    assert!(!missing.handle().is_bound());
    assert_eq!(fx.engine.refcount(engine), 1);

    let peer = MockPeer::new();
    fx.bridge
        .discoverer_new(&fx.env, &peer, &engine_peer, DiscovererFlavor::Media, Some("upnp"))
        .unwrap();
    let (discoverer, flavor) = fx.bridge.get(&fx.env, &peer).unwrap().as_discoverer().unwrap();
    assert_eq!(flavor, DiscovererFlavor::Media);

    fx.bridge.discoverer_start(&fx.env, &peer).unwrap();
    assert!(fx.engine.is_discovering(discoverer));
    fx.bridge.discoverer_stop(&fx.env, &peer).unwrap();
    assert!(!fx.engine.is_discovering(discoverer));

    fx.bridge.discoverer_release(&fx.env, &peer).unwrap();
    assert!(fx.engine.is_freed(discoverer.raw()));
    assert_eq!(fx.engine.refcount(engine), 1);
}

#[test]
fn test_renderer_items() {
    let fx = Fixture::new();
    let (engine_peer, engine) = fx.engine_peer();

    let err = fx
        .bridge
        .renderer_new(&fx.env, &MockPeer::new(), &engine_peer, 0)
        .unwrap_err();
    assert!(matches!(err, BridgeError::IllegalArgument(_)));

    let item = fx.engine.discover_renderer_item();
    let renderer = MockPeer::new();
    fx.bridge
        .renderer_new(&fx.env, &renderer, &engine_peer, item.get())
        .unwrap();
    assert!(fx.engine.is_live(item));
    assert_eq!(fx.engine.refcount(engine), 2);

    let (player, _window) = fx.player_peer(&engine_peer);
    fx.bridge
        .player_set_renderer(&fx.env, &player, Some(&renderer))
        .unwrap();
    let handle = fx.bridge.get(&fx.env, &player).unwrap().as_player().unwrap();
    assert_eq!(
        fx.engine.player(handle).unwrap().renderer.map(|r| r.raw()),
        Some(item)
    );
    fx.bridge.player_set_renderer(&fx.env, &player, None).unwrap();
    assert!(fx.engine.player(handle).unwrap().renderer.is_none());

    fx.bridge.renderer_release(&fx.env, &renderer).unwrap();
    assert!(fx.engine.is_freed(item));
}
