// JVM host runtime

use jni::objects::{GlobalRef, JFieldID, JMethodID, JObject, JValue, WeakRef};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{self, jobject};
use jni::{JNIEnv, JavaVM};
use mediabridge_core::{BridgeError, EventPayload, HostRuntime, NativeHandle, Result};
use once_cell::sync::OnceCell;
use std::ffi::{c_char, c_void, CString};
use std::ptr;

/// Base class of every peer
const PEER_CLASS: &str = "org/mediabridge/BridgeObject";
/// Java field holding the native handle on every peer class
const HANDLE_FIELD: &str = "mInstance";
const DISPATCH_METHOD: &str = "dispatchEventFromNative";
const DISPATCH_SIGNATURE: &str = "(IJJFLjava/lang/String;)V";

/// Raw `JNIEnv` pointer of the current thread
#[derive(Debug, Clone, Copy)]
pub struct JavaEnv(*mut sys::JNIEnv);

impl JavaEnv {
    pub fn from_jni(env: &JNIEnv) -> Self {
        Self(env.get_raw())
    }

    fn env(&self) -> Result<JNIEnv<'static>> {
        // SAFETY: the pointer came from the JVM for this thread and the
        // context never leaves it
        unsafe { JNIEnv::from_raw(self.0) }.map_err(jni_error)
    }
}

pub(crate) fn jni_error(err: jni::errors::Error) -> BridgeError {
    BridgeError::illegal_state(format!("JNI call failed: {}", err))
}

/// Member ids of the peer base class, resolved once
struct PeerIds {
    // Pins the class so the ids stay valid
    _class: GlobalRef,
    handle: JFieldID,
    dispatch: JMethodID,
}

impl PeerIds {
    fn resolve(env: &mut JNIEnv) -> Result<Self> {
        let class = env.find_class(PEER_CLASS).map_err(jni_error)?;
        let handle = env
            .get_field_id(&class, HANDLE_FIELD, "J")
            .map_err(jni_error)?;
        let dispatch = env
            .get_method_id(&class, DISPATCH_METHOD, DISPATCH_SIGNATURE)
            .map_err(jni_error)?;
        let global = env.new_global_ref(&class).map_err(jni_error)?;
        let _ = env.delete_local_ref(class);
        log::debug!("Resolved {} member ids", PEER_CLASS);
        Ok(Self {
            _class: global,
            handle,
            dispatch,
        })
    }
}

pub struct JniHost {
    vm: JavaVM,
    ids: OnceCell<PeerIds>,
}

impl JniHost {
    pub fn new(vm: JavaVM) -> Self {
        Self {
            vm,
            ids: OnceCell::new(),
        }
    }

    /// The first call comes from a Java thread creating a peer, where the
    /// application class loader can see the peer class
    fn ids(&self, env: &mut JNIEnv) -> Result<&PeerIds> {
        self.ids.get_or_try_init(|| PeerIds::resolve(env))
    }

    fn peer<'a>(peer: &jobject) -> JObject<'a> {
        // SAFETY: peers are live references handed in by the current native call
        unsafe { JObject::from_raw(*peer) }
    }
}

impl HostRuntime for JniHost {
    type Env = JavaEnv;
    type Peer = jobject;
    type WeakPeer = WeakRef;
    type Strong = JObject<'static>;
    type Retained = GlobalRef;

    fn current_env(&self) -> Option<JavaEnv> {
        self.vm.get_env().ok().map(|env| JavaEnv::from_jni(&env))
    }

    fn attach_current_thread(&self, label: &str) -> Result<JavaEnv> {
        let name = CString::new(label)
            .map_err(|_| BridgeError::illegal_argument("thread label contains NUL"))?;
        let mut args = sys::JavaVMAttachArgs {
            version: sys::JNI_VERSION_1_6,
            name: name.as_ptr() as *mut c_char,
            group: ptr::null_mut(),
        };

        let vm = self.vm.get_java_vm_pointer();
        let mut env: *mut c_void = ptr::null_mut();
        // SAFETY: `vm` is the process JavaVM; the interface table is never null
        let status = unsafe {
            let attach = (**vm)
                .AttachCurrentThread
                .ok_or_else(|| BridgeError::illegal_state("AttachCurrentThread unavailable"))?;
            attach(vm, &mut env, &mut args as *mut _ as *mut c_void)
        };

        if status != sys::JNI_OK || env.is_null() {
            return Err(BridgeError::illegal_state(format!(
                "AttachCurrentThread failed with {}",
                status
            )));
        }
        Ok(JavaEnv(env as *mut sys::JNIEnv))
    }

    fn detach_current_thread(&self, _env: &JavaEnv) {
        let vm = self.vm.get_java_vm_pointer();
        // SAFETY: only called for threads this host attached, on that thread
        unsafe {
            if let Some(detach) = (**vm).DetachCurrentThread {
                detach(vm);
            }
        }
    }

    fn load_handle(&self, env: &JavaEnv, peer: &jobject) -> Result<NativeHandle> {
        let mut env = env.env()?;
        let field = self.ids(&mut env)?.handle;
        // SAFETY: the id was resolved on the peer base class as a long field
        let value = unsafe {
            env.get_field_unchecked(Self::peer(peer), field, ReturnType::Primitive(Primitive::Long))
        }
        .and_then(|v| v.j())
        .map_err(jni_error)?;
        Ok(NativeHandle::from_raw(value))
    }

    fn store_handle(&self, env: &JavaEnv, peer: &jobject, handle: NativeHandle) -> Result<()> {
        let mut env = env.env()?;
        let field = self.ids(&mut env)?.handle;
        // SAFETY: the id was resolved on the peer base class as a long field
        unsafe { env.set_field_unchecked(Self::peer(peer), field, JValue::Long(handle.as_raw())) }
            .map_err(jni_error)
    }

    fn new_weak(&self, env: &JavaEnv, peer: &jobject) -> Result<WeakRef> {
        let env = env.env()?;
        env.new_weak_ref(Self::peer(peer))
            .map_err(|e| BridgeError::OutOfMemory(format!("weak reference: {}", e)))?
            .ok_or_else(|| BridgeError::illegal_state("peer is null"))
    }

    fn upgrade(&self, env: &JavaEnv, weak: &WeakRef) -> Option<JObject<'static>> {
        let env = env.env().ok()?;
        weak.upgrade_local(&env).ok().flatten()
    }

    fn dispatch(
        &self,
        env: &JavaEnv,
        target: JObject<'static>,
        payload: &EventPayload,
        text: Option<&str>,
    ) {
        let Ok(mut env) = env.env() else {
            return;
        };
        let method = match self.ids(&mut env) {
            Ok(ids) => ids.dispatch,
            Err(err) => {
                log::warn!("Dropping event {:#x}: {}", payload.event_type, err);
                let _ = env.exception_clear();
                let _ = env.delete_local_ref(target);
                return;
            }
        };

        let jtext = match text.map(|t| env.new_string(t)) {
            Some(Ok(s)) => JObject::from(s),
            Some(Err(err)) => {
                log::warn!("Event text not converted: {}", err);
                JObject::null()
            }
            None => JObject::null(),
        };

        let args = [
            JValue::Int(payload.event_type).as_jni(),
            JValue::Long(payload.arg1).as_jni(),
            JValue::Long(payload.arg2).as_jni(),
            JValue::Float(payload.argf).as_jni(),
            JValue::Object(&jtext).as_jni(),
        ];
        // SAFETY: the id matches DISPATCH_SIGNATURE and `args` follows it
        let result = unsafe {
            env.call_method_unchecked(
                &target,
                method,
                ReturnType::Primitive(Primitive::Void),
                &args,
            )
        };

        // Handler failures must not unwind into the engine's thread
        if result.is_err() || env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }

        let _ = env.delete_local_ref(jtext);
        let _ = env.delete_local_ref(target);
    }

    fn retain_object(&self, env: &JavaEnv, object: &jobject) -> Result<GlobalRef> {
        let env = env.env()?;
        let object = Self::peer(object);
        if object.is_null() {
            return Err(BridgeError::illegal_argument("window is null"));
        }
        env.new_global_ref(object)
            .map_err(|e| BridgeError::OutOfMemory(format!("global reference: {}", e)))
    }

    fn retained_raw(&self, retained: &GlobalRef) -> usize {
        retained.as_obj().as_raw() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_shared<T: Send + Sync>() {}

    #[test]
    fn test_host_is_shareable_across_engine_threads() {
        // The host lives in a static and resolves its ids from whichever
        // thread touches it first
        assert_shared::<JniHost>();
        assert_shared::<PeerIds>();
    }
}
