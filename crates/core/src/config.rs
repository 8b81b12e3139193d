// Construction-time configuration

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

static HOME_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Options for a new engine instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Command-line style options passed to the engine
    pub args: Vec<String>,
    /// Directory the engine should treat as `HOME`
    pub home_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(dir.into());
        self
    }

    /// Apply the `HOME` override. Only the first value in a process is
    /// applied; the environment is process-wide and read once by the engine.
    pub(crate) fn apply_process_overrides(&self) {
        if let Some(dir) = &self.home_dir {
            apply_home_override(dir);
        }
    }
}

fn apply_home_override(dir: &Path) -> bool {
    let mut applied = false;
    let current = HOME_OVERRIDE.get_or_init(|| {
        std::env::set_var("HOME", dir);
        applied = true;
        dir.to_path_buf()
    });

    if applied {
        log::info!("HOME set to {}", dir.display());
    } else if current != dir {
        log::warn!(
            "HOME already set to {}, ignoring {}",
            current.display(),
            dir.display()
        );
    }
    applied
}

/// Options for the bridge context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Name under which native event threads are registered with the host
    pub event_thread_label: String,
}

impl BridgeConfig {
    pub fn with_event_thread_label(mut self, label: impl Into<String>) -> Self {
        self.event_thread_label = label.into();
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            event_thread_label: "mediabridge".to_string(),
        }
    }
}
