// Per-thread attachment of native threads to the host runtime

use crate::host::HostRuntime;
use std::any::Any;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

struct Attachment {
    cache_id: u64,
    env: Box<dyn Any>,
    on_exit: Option<Box<dyn FnOnce()>>,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if let Some(detach) = self.on_exit.take() {
            detach();
        }
    }
}

thread_local! {
    // Destroyed on thread exit, which runs every attachment's detach hook
    static ATTACHMENTS: RefCell<Vec<Attachment>> = const { RefCell::new(Vec::new()) };
}

/// Makes arbitrary native threads able to call into the host runtime.
///
/// A thread the host already knows is used as is. Any other thread is
/// attached on first use, the context is cached in thread-local storage and
/// the thread is detached exactly once when it exits.
pub struct ThreadEnvironmentCache<H: HostRuntime> {
    id: u64,
    host: Arc<H>,
}

impl<H: HostRuntime> ThreadEnvironmentCache<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            id: NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            host,
        }
    }

    /// Attached context for the current thread, or `None` if it cannot be had
    pub fn get_context(&self, label: &str) -> Option<H::Env> {
        if let Some(env) = self.cached() {
            return Some(env);
        }

        if let Some(env) = self.host.current_env() {
            return Some(env);
        }

        let env = match self.host.attach_current_thread(label) {
            Ok(env) => env,
            Err(err) => {
                log::warn!("Failed to attach thread '{}': {}", label, err);
                return None;
            }
        };
        log::debug!("Attached native thread as '{}'", label);

        let host = self.host.clone();
        let owned_label = label.to_string();
        let exit_env = env.clone();
        let attachment = Attachment {
            cache_id: self.id,
            env: Box::new(env.clone()),
            on_exit: Some(Box::new(move || {
                host.detach_current_thread(&exit_env);
                log::debug!("Detached native thread '{}'", owned_label);
            })),
        };

        // Storage is gone while the thread is being torn down; dropping the
        // attachment detaches right away
        match ATTACHMENTS.try_with(|slot| slot.borrow_mut().push(attachment)) {
            Ok(()) => Some(env),
            Err(_) => None,
        }
    }

    fn cached(&self) -> Option<H::Env> {
        ATTACHMENTS
            .try_with(|slot| {
                slot.borrow()
                    .iter()
                    .find(|a| a.cache_id == self.id)
                    .and_then(|a| a.env.downcast_ref::<H::Env>())
                    .cloned()
            })
            .ok()
            .flatten()
    }
}
