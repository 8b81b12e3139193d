// Native event records, normalized payloads and per-kind translation

use crate::handle::{DiscovererFlavor, RendererHandle};
use crate::stop::SyncStopCoordinator;
use std::sync::Arc;

/// Engine event type code
pub type EventType = i32;

/// Event type codes published by the engine
pub mod event_type {
    use super::EventType;

    pub const MEDIA_META_CHANGED: EventType = 0;
    pub const MEDIA_SUB_ITEM_ADDED: EventType = 1;
    pub const MEDIA_DURATION_CHANGED: EventType = 2;
    pub const MEDIA_PARSED_CHANGED: EventType = 3;
    pub const MEDIA_STATE_CHANGED: EventType = 5;
    pub const MEDIA_SUB_ITEM_TREE_ADDED: EventType = 6;

    pub const PLAYER_MEDIA_CHANGED: EventType = 0x100;
    pub const PLAYER_OPENING: EventType = 0x102;
    pub const PLAYER_BUFFERING: EventType = 0x103;
    pub const PLAYER_PLAYING: EventType = 0x104;
    pub const PLAYER_PAUSED: EventType = 0x105;
    pub const PLAYER_STOPPED: EventType = 0x106;
    pub const PLAYER_END_REACHED: EventType = 0x109;
    pub const PLAYER_ENCOUNTERED_ERROR: EventType = 0x10A;
    pub const PLAYER_TIME_CHANGED: EventType = 0x10B;
    pub const PLAYER_POSITION_CHANGED: EventType = 0x10C;
    pub const PLAYER_SEEKABLE_CHANGED: EventType = 0x10D;
    pub const PLAYER_PAUSABLE_CHANGED: EventType = 0x10E;
    pub const PLAYER_LENGTH_CHANGED: EventType = 0x111;
    pub const PLAYER_VOUT: EventType = 0x112;
    pub const PLAYER_ES_ADDED: EventType = 0x114;
    pub const PLAYER_ES_DELETED: EventType = 0x115;
    pub const PLAYER_ES_SELECTED: EventType = 0x116;
    pub const PLAYER_RECORD_CHANGED: EventType = 0x11E;
    pub const PLAYER_STOPPING: EventType = 0x11F;

    pub const MEDIA_DISCOVERER_STARTED: EventType = 0x500;
    pub const MEDIA_DISCOVERER_ENDED: EventType = 0x501;
    pub const RENDERER_DISCOVERER_ITEM_ADDED: EventType = 0x502;
    pub const RENDERER_DISCOVERER_ITEM_DELETED: EventType = 0x503;
}

use event_type::*;

pub(crate) const MEDIA_EVENTS: &[EventType] = &[
    MEDIA_META_CHANGED,
    MEDIA_SUB_ITEM_ADDED,
    MEDIA_DURATION_CHANGED,
    MEDIA_PARSED_CHANGED,
    MEDIA_STATE_CHANGED,
    MEDIA_SUB_ITEM_TREE_ADDED,
];

#[cfg(feature = "async-stop")]
const PLAYER_END_EVENT: EventType = PLAYER_STOPPING;
#[cfg(not(feature = "async-stop"))]
const PLAYER_END_EVENT: EventType = PLAYER_END_REACHED;

pub(crate) const PLAYER_EVENTS: &[EventType] = &[
    PLAYER_MEDIA_CHANGED,
    PLAYER_OPENING,
    PLAYER_BUFFERING,
    PLAYER_PLAYING,
    PLAYER_PAUSED,
    PLAYER_STOPPED,
    PLAYER_END_EVENT,
    PLAYER_ENCOUNTERED_ERROR,
    PLAYER_TIME_CHANGED,
    PLAYER_POSITION_CHANGED,
    PLAYER_VOUT,
    PLAYER_ES_ADDED,
    PLAYER_ES_DELETED,
    PLAYER_ES_SELECTED,
    PLAYER_SEEKABLE_CHANGED,
    PLAYER_PAUSABLE_CHANGED,
    PLAYER_LENGTH_CHANGED,
    PLAYER_RECORD_CHANGED,
];

pub(crate) const MEDIA_DISCOVERER_EVENTS: &[EventType] =
    &[MEDIA_DISCOVERER_STARTED, MEDIA_DISCOVERER_ENDED];

pub(crate) const RENDERER_DISCOVERER_EVENTS: &[EventType] =
    &[RENDERER_DISCOVERER_ITEM_ADDED, RENDERER_DISCOVERER_ITEM_DELETED];

/// Typed body of a native event record
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    None,
    MediaMetaChanged { meta_type: i32 },
    MediaDurationChanged { duration_ms: i64 },
    MediaParsedChanged { status: i32 },
    MediaStateChanged { state: i32 },
    Buffering { cache: f32 },
    PositionChanged { position: f32 },
    TimeChanged { time_ms: i64 },
    Vout { count: i32 },
    EsChanged { es_type: i32, id: i32 },
    SeekableChanged { seekable: bool },
    PausableChanged { pausable: bool },
    LengthChanged { length_ms: i64 },
    /// `file_path` is raw engine text, not yet validated
    RecordChanged { recording: bool, file_path: Option<Vec<u8>> },
    RendererItem { item: RendererHandle, name: Option<Vec<u8>> },
}

/// Event record as the engine hands it to a listener
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    pub event_type: EventType,
    pub data: EventData,
}

impl NativeEvent {
    pub fn new(event_type: EventType, data: EventData) -> Self {
        Self { event_type, data }
    }

    pub fn bare(event_type: EventType) -> Self {
        Self::new(event_type, EventData::None)
    }
}

/// Normalized payload handed to the peer's dispatch entry point
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub event_type: EventType,
    pub arg1: i64,
    pub arg2: i64,
    pub argf: f32,
    pub text: Option<Vec<u8>>,
}

impl EventPayload {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            arg1: 0,
            arg2: 0,
            argf: 0.0,
            text: None,
        }
    }
}

/// Validate engine text before it reaches the host.
///
/// Text ends at the first NUL. Anything that is not well-formed UTF-8 up to
/// that point yields `None` rather than a corrupted string.
pub fn marshal_text(raw: &[u8]) -> Option<&str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    match std::str::from_utf8(&raw[..end]) {
        Ok(text) => Some(text),
        Err(err) => {
            log::error!("Dropping malformed event text: {}", err);
            None
        }
    }
}

/// Kind-specific translation from native records to payloads
pub(crate) enum Translator {
    Media,
    Player { stop: Arc<SyncStopCoordinator> },
    Discoverer(DiscovererFlavor),
}

impl Translator {
    pub(crate) fn translate(&self, event: &NativeEvent) -> EventPayload {
        let mut payload = EventPayload::new(event.event_type);
        match self {
            Translator::Media => translate_media(&event.data, &mut payload),
            Translator::Player { stop } => {
                if event.event_type == PLAYER_STOPPED {
                    stop.on_stopped_event();
                }
                translate_player(&event.data, &mut payload);
            }
            Translator::Discoverer(DiscovererFlavor::Renderer) => {
                if let EventData::RendererItem { item, name } = &event.data {
                    payload.arg1 = item.raw().get() as i64;
                    payload.text = name.clone();
                }
            }
            // Started/ended carry no data
            Translator::Discoverer(DiscovererFlavor::Media) => {}
        }
        payload
    }
}

fn translate_media(data: &EventData, payload: &mut EventPayload) {
    match data {
        EventData::MediaMetaChanged { meta_type } => payload.arg1 = *meta_type as i64,
        EventData::MediaDurationChanged { duration_ms } => payload.arg1 = *duration_ms,
        EventData::MediaParsedChanged { status } => payload.arg1 = *status as i64,
        EventData::MediaStateChanged { state } => payload.arg1 = *state as i64,
        _ => {}
    }
}

fn translate_player(data: &EventData, payload: &mut EventPayload) {
    match data {
        EventData::Buffering { cache } => payload.argf = *cache,
        EventData::PositionChanged { position } => payload.argf = *position,
        EventData::TimeChanged { time_ms } => payload.arg1 = *time_ms,
        EventData::Vout { count } => payload.arg1 = *count as i64,
        EventData::EsChanged { es_type, id } => {
            payload.arg1 = *es_type as i64;
            payload.arg2 = *id as i64;
        }
        EventData::SeekableChanged { seekable } => payload.arg1 = *seekable as i64,
        EventData::PausableChanged { pausable } => payload.arg1 = *pausable as i64,
        EventData::LengthChanged { length_ms } => payload.arg1 = *length_ms,
        EventData::RecordChanged {
            recording,
            file_path,
        } => {
            payload.arg1 = *recording as i64;
            payload.text = file_path.clone();
        }
        _ => {}
    }
}
