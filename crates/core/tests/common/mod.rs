// Shared fixture for bridge tests

#![allow(dead_code)]

use mediabridge_core::testing::{MockEngine, MockEnv, MockHost, MockPeer};
use mediabridge_core::{Bridge, BridgeConfig, EngineConfig, EngineHandle};
use std::sync::Arc;

pub struct Fixture {
    pub host: Arc<MockHost>,
    pub engine: MockEngine,
    pub bridge: Bridge<MockHost>,
    pub env: MockEnv,
}

impl Fixture {
    pub fn new() -> Self {
        let host = MockHost::new();
        let engine = MockEngine::new();
        let bridge = Bridge::init(
            host.clone(),
            Arc::new(engine.clone()),
            BridgeConfig::default().with_event_thread_label("test-events"),
        );
        let env = host.enter();
        Self {
            host,
            engine,
            bridge,
            env,
        }
    }

    /// Root engine object bound to a fresh peer
    pub fn engine_peer(&self) -> (Arc<MockPeer>, EngineHandle) {
        let peer = MockPeer::new();
        self.bridge
            .engine_new(&self.env, &peer, &EngineConfig::new().with_args(["-vv"]))
            .unwrap();
        let handle = self.bridge.get(&self.env, &peer).unwrap().root_engine().unwrap();
        (peer, handle)
    }

    pub fn media_peer(&self, engine_peer: &Arc<MockPeer>) -> Arc<MockPeer> {
        let peer = MockPeer::new();
        self.bridge
            .media_new(
                &self.env,
                &peer,
                engine_peer,
                &mediabridge_core::MediaSource::Location("http://example.com/a.mp4".into()),
            )
            .unwrap();
        peer
    }

    pub fn player_peer(&self, engine_peer: &Arc<MockPeer>) -> (Arc<MockPeer>, Arc<MockPeer>) {
        let peer = MockPeer::new();
        let window = MockPeer::new();
        self.bridge
            .player_new(&self.env, &peer, engine_peer, &window)
            .unwrap();
        (peer, window)
    }
}
