//! Plugin lifecycle management

use super::{Plugin, PluginInfo, PluginState};
use crate::error::PluginError;
use crate::server::Server;
use std::time::Instant;

/// A plugin together with its lifecycle state
pub struct PluginHandle {
    pub info: PluginInfo,
    state: PluginState,
    plugin: Box<dyn Plugin>,
    /// Last state change time
    last_state_change: Instant,
}

impl PluginHandle {
    pub fn new(plugin: Box<dyn Plugin>) -> Self {
        let info = plugin.info();
        Self {
            info,
            state: PluginState::Unloaded,
            plugin,
            last_state_change: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn version(&self) -> &semver::Version {
        &self.info.version
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn api_version(&self) -> u32 {
        self.plugin.api_version()
    }

    pub fn last_state_change(&self) -> Instant {
        self.last_state_change
    }

    /// Run the plugin's load entry point.
    ///
    /// A failed load is rolled back with a forced unload; the handle stays
    /// `Unloaded` and should be dropped.
    pub fn load(&mut self, server: &mut Server) -> Result<(), PluginError> {
        if self.state != PluginState::Unloaded {
            return Err(PluginError::AlreadyLoaded(self.info.name.clone()));
        }

        match self.plugin.load(server) {
            Ok(()) => {
                self.set_state(PluginState::Loaded)?;
                tracing::info!("Loaded plugin: {} v{}", self.info.name, self.info.version);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load plugin '{}': {:#}", self.info.name, e);
                self.plugin.unload(server, true);
                Err(PluginError::LoadFailed {
                    name: self.info.name.clone(),
                    reason: format!("{:#}", e),
                })
            }
        }
    }

    /// Run the plugin's unload entry point.
    ///
    /// Without `force` a refusal puts the plugin back to `Loaded` with all its
    /// registrations intact.
    pub fn unload(&mut self, server: &mut Server, force: bool) -> Result<(), PluginError> {
        if self.state != PluginState::Loaded {
            return Err(PluginError::NotLoaded(self.info.name.clone()));
        }

        self.set_state(PluginState::Unloading)?;
        let agreed = self.plugin.unload(server, force);

        if !agreed && !force {
            self.set_state(PluginState::Loaded)?;
            tracing::warn!("Plugin {} refused to unload", self.info.name);
            return Err(PluginError::UnloadRefused(self.info.name.clone()));
        }

        if !agreed {
            tracing::warn!("Plugin {} refused to unload, forcing", self.info.name);
        }
        self.set_state(PluginState::Unloaded)?;
        tracing::info!("Unloaded plugin: {} v{}", self.info.name, self.info.version);
        Ok(())
    }

    /// Set plugin state with validation
    fn set_state(&mut self, new_state: PluginState) -> Result<(), PluginError> {
        if !self.state.can_transition_to(new_state) {
            return Err(PluginError::InvalidTransition {
                name: self.info.name.clone(),
                from: self.state,
                to: new_state,
            });
        }

        tracing::debug!("Plugin {} state: {} -> {}", self.info.name, self.state, new_state);
        self.state = new_state;
        self.last_state_change = Instant::now();
        Ok(())
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("info", &self.info)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
