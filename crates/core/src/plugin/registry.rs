//! Registry of loaded plugins

use super::{Plugin, PluginHandle};
use crate::error::PluginError;
use crate::server::Server;

/// Loaded plugins, in load order
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<PluginHandle>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the plugin's API version and run its load entry point.
    ///
    /// A plugin that fails to load is force-unloaded and dropped.
    pub fn load(&mut self, server: &mut Server, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        let mut handle = PluginHandle::new(plugin);
        let name = handle.name().to_owned();

        if self.get(&name).is_some() {
            return Err(PluginError::AlreadyLoaded(name));
        }

        let expected = server.config().plugins.api_version;
        if handle.api_version() != expected {
            let error = PluginError::ApiVersion { name, expected, found: handle.api_version() };
            tracing::error!("{}", error);
            return Err(error);
        }

        handle.load(server)?;
        self.plugins.push(handle);
        Ok(())
    }

    /// Unload a plugin by name and drop it.
    pub fn unload(&mut self, server: &mut Server, name: &str, force: bool) -> Result<(), PluginError> {
        let index = self
            .plugins
            .iter()
            .position(|plugin| plugin.name() == name)
            .ok_or_else(|| PluginError::NotLoaded(name.to_owned()))?;

        self.plugins[index].unload(server, force)?;
        self.plugins.remove(index);
        Ok(())
    }

    /// Unload every plugin, most recently loaded first.
    ///
    /// Returns the errors of plugins that stayed loaded.
    pub fn unload_all(&mut self, server: &mut Server, force: bool) -> Vec<PluginError> {
        let mut errors = Vec::new();
        let mut kept = Vec::new();

        while let Some(mut plugin) = self.plugins.pop() {
            match plugin.unload(server, force) {
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!("{}", e);
                    errors.push(e);
                    kept.push(plugin);
                }
            }
        }

        kept.reverse();
        self.plugins = kept;
        errors
    }

    /// Unload everything, honouring `plugins.force_unload_on_shutdown`.
    pub fn shutdown(&mut self, server: &mut Server) -> Vec<PluginError> {
        let force = server.config().plugins.force_unload_on_shutdown;
        tracing::info!("Shutting down {} plugins", self.plugins.len());
        self.unload_all(server, force)
    }

    pub fn get(&self, name: &str) -> Option<&PluginHandle> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in load order
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(PluginHandle::name).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
