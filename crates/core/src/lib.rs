// Core of the media bridge: native engine resources bound to managed peers

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_bridge;
pub mod handle;
pub mod host;
pub mod object;
pub mod peers;
pub mod refcount;
pub mod stop;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod thread_env;

mod ops;

// Re-export commonly used types
pub use bridge::Bridge;
pub use config::{BridgeConfig, EngineConfig};
pub use engine::{Engine, EventCallback, EventSource, ListenerId, MediaSource, Viewpoint};
pub use error::{BridgeError, Result};
pub use event::{event_type, marshal_text, EventData, EventPayload, EventType, NativeEvent};
pub use handle::{
    DiscovererFlavor, DiscovererHandle, EngineHandle, MediaHandle, NativeHandle, NativeResource,
    PlayerHandle, RawHandle, RendererHandle, ResourceKind,
};
pub use host::HostRuntime;
pub use object::BridgeObject;
pub use stop::SyncStopCoordinator;
pub use thread_env::ThreadEnvironmentCache;
