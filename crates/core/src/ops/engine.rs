// Root engine instance

use crate::bridge::Bridge;
use crate::config::EngineConfig;
use crate::error::{BridgeError, Result};
use crate::handle::{NativeHandle, NativeResource, ResourceKind};
use crate::host::HostRuntime;

impl<H: HostRuntime> Bridge<H> {
    /// Create the root engine instance for `peer`
    pub fn engine_new(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        config: &EngineConfig,
    ) -> Result<NativeHandle> {
        config.apply_process_overrides();
        self.create(env, peer, ResourceKind::Engine, None, |owner| {
            let instance = self.engine.new_instance(&config.args)?;
            owner.resource = Some(NativeResource::Engine(instance));
            Ok(())
        })
    }

    pub fn engine_release(&self, env: &H::Env, peer: &H::Peer) -> Result<()> {
        self.release(env, peer)
    }

    /// Raw pointer value of the engine instance
    pub fn engine_instance(&self, env: &H::Env, peer: &H::Peer) -> Result<usize> {
        Ok(self.get(env, peer)?.root_engine()?.raw().get())
    }

    pub fn engine_version(&self) -> String {
        self.engine.version()
    }

    /// Leading integer of the version string, `0` when there is none
    pub fn engine_major_version(&self) -> i32 {
        parse_major_version(&self.engine.version())
    }

    pub fn engine_compiler(&self) -> String {
        self.engine.compiler()
    }

    pub fn engine_changeset(&self) -> String {
        self.engine.changeset()
    }

    pub fn engine_set_user_agent(
        &self,
        env: &H::Env,
        peer: &H::Peer,
        name: Option<&str>,
        http: Option<&str>,
    ) -> Result<()> {
        let engine = self.get(env, peer)?.root_engine()?;
        let (Some(name), Some(http)) = (name, http) else {
            return Err(BridgeError::illegal_argument("name and http are required"));
        };
        self.engine.set_user_agent(engine, name, http);
        Ok(())
    }
}

fn parse_major_version(version: &str) -> i32 {
    let digits: String = version
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}
