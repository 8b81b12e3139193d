// JNI bindings for the media bridge
// Captures the JavaVM on load and exposes the bridge to the org.mediabridge classes.

use jni::sys::{jint, JNI_VERSION_1_6};
use jni::JavaVM;
use mediabridge_core::{Bridge, BridgeConfig, BridgeError, Engine, Result};
use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::sync::{Arc, Once};

pub mod host;
mod natives;

pub use host::{JavaEnv, JniHost};

static HOST: OnceCell<Arc<JniHost>> = OnceCell::new();
static BRIDGE: OnceCell<Bridge<JniHost>> = OnceCell::new();
static INIT_LOGGER: Once = Once::new();

/// Initialize the platform logger once per process
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        #[cfg(feature = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("MediaBridge"),
            );
        }

        #[cfg(all(feature = "desktop", not(feature = "android")))]
        {
            let _ = env_logger::builder()
                .is_test(false)
                .filter_level(log::LevelFilter::Info)
                .try_init();
        }
    });
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    init_logging();
    if HOST.set(Arc::new(JniHost::new(vm))).is_err() {
        log::warn!("JNI_OnLoad called twice, keeping the first JavaVM");
    }
    log::info!("mediabridge loaded");
    JNI_VERSION_1_6
}

#[no_mangle]
pub extern "system" fn JNI_OnUnload(_vm: JavaVM, _reserved: *mut c_void) {
    if let Some(bridge) = BRIDGE.get() {
        if let Err(err) = bridge.teardown() {
            log::warn!("Unloading with live objects: {}", err);
        }
    }
}

/// Install the native engine the bridge wraps. Must run after `JNI_OnLoad`
/// and before the first Java object is created.
pub fn install_engine(engine: Arc<dyn Engine>, config: BridgeConfig) -> Result<()> {
    let host = HOST
        .get()
        .cloned()
        .ok_or_else(|| BridgeError::illegal_state("JNI_OnLoad has not run"))?;
    BRIDGE
        .set(Bridge::init(host, engine, config))
        .map_err(|_| BridgeError::illegal_state("engine already installed"))
}

pub(crate) fn bridge() -> Result<&'static Bridge<JniHost>> {
    BRIDGE
        .get()
        .ok_or_else(|| BridgeError::illegal_state("no engine installed"))
}

/// Java exception class thrown for a bridge error
pub(crate) fn exception_class(err: &BridgeError) -> &'static str {
    match err {
        BridgeError::IllegalState(_) => "java/lang/IllegalStateException",
        BridgeError::IllegalArgument(_) => "java/lang/IllegalArgumentException",
        BridgeError::OutOfMemory(_) => "java/lang/OutOfMemoryError",
        BridgeError::Engine(_) => "java/lang/RuntimeException",
    }
}
