// Java_org_mediabridge_* entry points

use crate::host::{jni_error, JavaEnv, JniHost};
use crate::{bridge, exception_class};
use jni::objects::{JClass, JObject, JObjectArray, JString};
use jni::sys::{jboolean, jfloat, jint, jlong, jstring, JNI_TRUE};
use jni::JNIEnv;
use mediabridge_core::{
    Bridge, BridgeError, DiscovererFlavor, EngineConfig, MediaSource, Result,
};

fn throw(env: &mut JNIEnv, err: &BridgeError) {
    // A pending exception from a failed JNI call already describes the problem
    if env.exception_check().unwrap_or(false) {
        return;
    }
    if let Err(e) = env.throw_new(exception_class(err), err.to_string()) {
        log::error!("Failed to throw {}: {}", exception_class(err), e);
    }
}

/// Run `op` against the installed bridge, throwing on failure
fn with_bridge<R: Default>(
    env: &mut JNIEnv,
    op: impl FnOnce(&Bridge<JniHost>, &JavaEnv, &mut JNIEnv) -> Result<R>,
) -> R {
    let java_env = JavaEnv::from_jni(env);
    match bridge().and_then(|b| op(b, &java_env, env)) {
        Ok(value) => value,
        Err(err) => {
            throw(env, &err);
            R::default()
        }
    }
}

fn opt_string(env: &mut JNIEnv, value: &JString) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    let value = env
        .get_string(value)
        .map_err(|e| BridgeError::illegal_argument(format!("invalid string: {}", e)))?;
    Ok(Some(value.into()))
}

fn string_array(env: &mut JNIEnv, array: &JObjectArray) -> Result<Vec<String>> {
    if array.is_null() {
        return Ok(Vec::new());
    }
    let len = env.get_array_length(array).map_err(jni_error)?;
    let mut elements = Vec::with_capacity(len as usize);
    for i in 0..len {
        let element = JString::from(env.get_object_array_element(array, i).map_err(jni_error)?);
        let value = opt_string(env, &element);
        env.delete_local_ref(element).map_err(jni_error)?;
        elements.push(value?);
    }
    collect_args(elements)
}

/// Engine arguments must all be present; a null entry rejects the whole list
fn collect_args(elements: Vec<Option<String>>) -> Result<Vec<String>> {
    elements
        .into_iter()
        .enumerate()
        .map(|(i, element)| {
            element.ok_or_else(|| {
                BridgeError::illegal_argument(format!("engine argument {} is null", i))
            })
        })
        .collect()
}

fn new_jstring(env: &mut JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(err) => {
            log::error!("Failed to create Java string: {}", err);
            std::ptr::null_mut()
        }
    }
}

fn peer_or_none(obj: &JObject) -> Option<jni::sys::jobject> {
    (!obj.is_null()).then(|| obj.as_raw())
}

// -----------------------------------------------------------------------------
// Engine
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeNew(
    mut env: JNIEnv,
    thiz: JObject,
    args: JObjectArray,
    home_dir: JString,
) {
    with_bridge(&mut env, |b, java, env| {
        let mut config = EngineConfig::new().with_args(string_array(env, &args)?);
        if let Some(dir) = opt_string(env, &home_dir)? {
            config = config.with_home_dir(dir);
        }
        b.engine_new(java, &thiz.as_raw(), &config).map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeRelease(mut env: JNIEnv, thiz: JObject) {
    with_bridge(&mut env, |b, java, _| b.engine_release(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeInstance(
    mut env: JNIEnv,
    thiz: JObject,
) -> jlong {
    with_bridge(&mut env, |b, java, _| {
        b.engine_instance(java, &thiz.as_raw()).map(|raw| raw as jlong)
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeVersion(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    match bridge() {
        Ok(b) => new_jstring(&mut env, &b.engine_version()),
        Err(err) => {
            throw(&mut env, &err);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeMajorVersion(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    with_bridge(&mut env, |b, _, _| Ok(b.engine_major_version()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeCompiler(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    match bridge() {
        Ok(b) => new_jstring(&mut env, &b.engine_compiler()),
        Err(err) => {
            throw(&mut env, &err);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeChangeset(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    match bridge() {
        Ok(b) => new_jstring(&mut env, &b.engine_changeset()),
        Err(err) => {
            throw(&mut env, &err);
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Engine_nativeSetUserAgent(
    mut env: JNIEnv,
    thiz: JObject,
    name: JString,
    http: JString,
) {
    with_bridge(&mut env, |b, java, env| {
        let name = opt_string(env, &name)?;
        let http = opt_string(env, &http)?;
        b.engine_set_user_agent(java, &thiz.as_raw(), name.as_deref(), http.as_deref())
    })
}

// -----------------------------------------------------------------------------
// Media
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Media_nativeNewFromLocation(
    mut env: JNIEnv,
    thiz: JObject,
    engine: JObject,
    location: JString,
) {
    with_bridge(&mut env, |b, java, env| {
        let location = opt_string(env, &location)?
            .ok_or_else(|| BridgeError::illegal_argument("location is null"))?;
        let source = MediaSource::Location(location);
        b.media_new(java, &thiz.as_raw(), &engine.as_raw(), &source)
            .map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Media_nativeNewFromPath(
    mut env: JNIEnv,
    thiz: JObject,
    engine: JObject,
    path: JString,
) {
    with_bridge(&mut env, |b, java, env| {
        let path = opt_string(env, &path)?
            .ok_or_else(|| BridgeError::illegal_argument("path is null"))?;
        let source = MediaSource::Path(path.into());
        b.media_new(java, &thiz.as_raw(), &engine.as_raw(), &source)
            .map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Media_nativeRelease(mut env: JNIEnv, thiz: JObject) {
    with_bridge(&mut env, |b, java, _| b.media_release(java, &thiz.as_raw()))
}

// -----------------------------------------------------------------------------
// MediaPlayer
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeNewFromEngine(
    mut env: JNIEnv,
    thiz: JObject,
    engine: JObject,
    window: JObject,
) {
    with_bridge(&mut env, |b, java, _| {
        b.player_new(java, &thiz.as_raw(), &engine.as_raw(), &window.as_raw())
            .map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeNewFromMedia(
    mut env: JNIEnv,
    thiz: JObject,
    media: JObject,
    window: JObject,
) {
    with_bridge(&mut env, |b, java, _| {
        b.player_new_from_media(java, &thiz.as_raw(), &media.as_raw(), &window.as_raw())
            .map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeRelease(
    mut env: JNIEnv,
    thiz: JObject,
) {
    with_bridge(&mut env, |b, java, _| b.player_release(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativePlay(mut env: JNIEnv, thiz: JObject) {
    with_bridge(&mut env, |b, java, _| b.player_play(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativePause(mut env: JNIEnv, thiz: JObject) {
    with_bridge(&mut env, |b, java, _| b.player_pause(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeStop(mut env: JNIEnv, thiz: JObject) {
    with_bridge(&mut env, |b, java, _| b.player_stop(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeSetMedia(
    mut env: JNIEnv,
    thiz: JObject,
    media: JObject,
) {
    with_bridge(&mut env, |b, java, _| {
        let media = peer_or_none(&media);
        b.player_set_media(java, &thiz.as_raw(), media.as_ref())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeSetRenderer(
    mut env: JNIEnv,
    thiz: JObject,
    renderer: JObject,
) -> jboolean {
    with_bridge(&mut env, |b, java, _| {
        let renderer = peer_or_none(&renderer);
        b.player_set_renderer(java, &thiz.as_raw(), renderer.as_ref())
            .map(|_| JNI_TRUE)
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeGetRate(
    mut env: JNIEnv,
    thiz: JObject,
) -> jfloat {
    with_bridge(&mut env, |b, java, _| b.player_rate(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeSetRate(
    mut env: JNIEnv,
    thiz: JObject,
    rate: jfloat,
) {
    with_bridge(&mut env, |b, java, _| b.player_set_rate(java, &thiz.as_raw(), rate))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaPlayer_nativeUpdateViewpoint(
    mut env: JNIEnv,
    thiz: JObject,
    yaw: jfloat,
    pitch: jfloat,
    roll: jfloat,
    fov: jfloat,
    absolute: jboolean,
) -> jboolean {
    with_bridge(&mut env, |b, java, _| {
        b.player_update_viewpoint(java, &thiz.as_raw(), yaw, pitch, roll, fov, absolute != 0)
            .map(|_| JNI_TRUE)
    })
}

// -----------------------------------------------------------------------------
// Discoverers
// -----------------------------------------------------------------------------

fn new_discoverer(
    env: &mut JNIEnv,
    thiz: &JObject,
    engine: &JObject,
    name: &JString,
    flavor: DiscovererFlavor,
) {
    with_bridge(env, |b, java, env| {
        let name = opt_string(env, name)?;
        b.discoverer_new(java, &thiz.as_raw(), &engine.as_raw(), flavor, name.as_deref())
            .map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_MediaDiscoverer_nativeNew(
    mut env: JNIEnv,
    thiz: JObject,
    engine: JObject,
    name: JString,
) {
    new_discoverer(&mut env, &thiz, &engine, &name, DiscovererFlavor::Media)
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_RendererDiscoverer_nativeNew(
    mut env: JNIEnv,
    thiz: JObject,
    engine: JObject,
    name: JString,
) {
    new_discoverer(&mut env, &thiz, &engine, &name, DiscovererFlavor::Renderer)
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Discoverer_nativeStart(
    mut env: JNIEnv,
    thiz: JObject,
) -> jboolean {
    with_bridge(&mut env, |b, java, _| {
        b.discoverer_start(java, &thiz.as_raw()).map(|_| JNI_TRUE)
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Discoverer_nativeStop(mut env: JNIEnv, thiz: JObject) {
    with_bridge(&mut env, |b, java, _| b.discoverer_stop(java, &thiz.as_raw()))
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_Discoverer_nativeRelease(
    mut env: JNIEnv,
    thiz: JObject,
) {
    with_bridge(&mut env, |b, java, _| b.discoverer_release(java, &thiz.as_raw()))
}

// -----------------------------------------------------------------------------
// Renderer items
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_RendererItem_nativeNew(
    mut env: JNIEnv,
    thiz: JObject,
    engine: JObject,
    item: jlong,
) {
    with_bridge(&mut env, |b, java, _| {
        b.renderer_new(java, &thiz.as_raw(), &engine.as_raw(), item as usize)
            .map(|_| ())
    })
}

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_RendererItem_nativeRelease(
    mut env: JNIEnv,
    thiz: JObject,
) {
    with_bridge(&mut env, |b, java, _| b.renderer_release(java, &thiz.as_raw()))
}

// -----------------------------------------------------------------------------
// Shared
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "system" fn Java_org_mediabridge_BridgeObject_nativeDetachEvents(
    mut env: JNIEnv,
    thiz: JObject,
) {
    with_bridge(&mut env, |b, java, _| b.detach_events(java, &thiz.as_raw()))
}
