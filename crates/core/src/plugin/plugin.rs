//! Core plugin trait and types

use super::PLUGIN_API_VERSION;
use crate::server::Server;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Core trait that all plugins must implement
pub trait Plugin: Send {
    /// Get plugin information and metadata
    fn info(&self) -> PluginInfo;

    /// Plugin API version the plugin was built against.
    ///
    /// The host refuses to load a plugin whose version differs from its own.
    fn api_version(&self) -> u32 {
        PLUGIN_API_VERSION
    }

    /// Acquire resources: define blocks, register bunches.
    ///
    /// On error the host calls [`Plugin::unload`] with `force` set and drops
    /// the plugin, so `unload` must cope with a partially completed load.
    fn load(&mut self, server: &mut Server) -> Result<()>;

    /// Release everything acquired in [`Plugin::load`].
    ///
    /// Returning `false` refuses the unload; the host keeps the plugin loaded
    /// unless `force` is set, in which case the answer is ignored.
    fn unload(&mut self, server: &mut Server, force: bool) -> bool;
}

/// Plugin information and metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name (must be unique)
    pub name: String,
    pub version: semver::Version,
    pub description: String,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>, version: semver::Version) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Plugin state in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginState {
    /// Not loaded, or dropped after unloading
    Unloaded,
    /// Resources acquired
    Loaded,
    /// Releasing resources
    Unloading,
}

impl PluginState {
    pub fn is_loaded(self) -> bool {
        !matches!(self, Self::Unloaded)
    }

    /// Get the next valid states from the current state
    pub fn valid_transitions(self) -> &'static [PluginState] {
        match self {
            Self::Unloaded => &[Self::Loaded],
            Self::Loaded => &[Self::Unloading],
            // Back to Loaded when the plugin refuses to go
            Self::Unloading => &[Self::Unloaded, Self::Loaded],
        }
    }

    /// Check if transition to another state is valid
    pub fn can_transition_to(self, target: PluginState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => write!(f, "Unloaded"),
            Self::Loaded => write!(f, "Loaded"),
            Self::Unloading => write!(f, "Unloading"),
        }
    }
}
