// Opaque native handles and the tagged native resource

use std::fmt;
use std::num::NonZeroUsize;

/// Integer stored in a managed peer's handle field. `0` means unbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(i64);

impl NativeHandle {
    pub const UNBOUND: NativeHandle = NativeHandle(0);

    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> i64 {
        self.0
    }

    pub fn is_bound(self) -> bool {
        self.0 != 0
    }
}

/// Engine-side pointer value, never null
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    pub fn new(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl From<NonZeroUsize> for RawHandle {
    fn from(value: NonZeroUsize) -> Self {
        Self(value)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(RawHandle);

        impl $name {
            pub fn from_raw(raw: RawHandle) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> RawHandle {
                self.0
            }
        }
    };
}

typed_handle!(
    /// Root engine instance; the shared refcounted handle
    EngineHandle
);
typed_handle!(
    /// Media item
    MediaHandle
);
typed_handle!(
    /// Media player
    PlayerHandle
);
typed_handle!(
    /// Renderer item found by a renderer discoverer
    RendererHandle
);
typed_handle!(
    /// Media or renderer discoverer
    DiscovererHandle
);

/// Resource kinds a bridge object can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Engine,
    Media,
    Player,
    Renderer,
    Discoverer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResourceKind::Engine => "engine",
            ResourceKind::Media => "media",
            ResourceKind::Player => "player",
            ResourceKind::Renderer => "renderer",
            ResourceKind::Discoverer => "discoverer",
        };
        f.write_str(name)
    }
}

/// What a discoverer looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscovererFlavor {
    Media,
    Renderer,
}

/// Native resource owned by a bridge object, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeResource {
    Engine(EngineHandle),
    Media(MediaHandle),
    Player(PlayerHandle),
    Renderer(RendererHandle),
    Discoverer(DiscovererHandle, DiscovererFlavor),
}

impl NativeResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            NativeResource::Engine(_) => ResourceKind::Engine,
            NativeResource::Media(_) => ResourceKind::Media,
            NativeResource::Player(_) => ResourceKind::Player,
            NativeResource::Renderer(_) => ResourceKind::Renderer,
            NativeResource::Discoverer(..) => ResourceKind::Discoverer,
        }
    }

    pub fn raw(&self) -> RawHandle {
        match self {
            NativeResource::Engine(h) => h.raw(),
            NativeResource::Media(h) => h.raw(),
            NativeResource::Player(h) => h.raw(),
            NativeResource::Renderer(h) => h.raw(),
            NativeResource::Discoverer(h, _) => h.raw(),
        }
    }
}
