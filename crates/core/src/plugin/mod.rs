//! Plugin system
//!
//! A plugin owns block definitions and resource bunches. It acquires them in
//! [`Plugin::load`] and must give all of them back in [`Plugin::unload`]
//! before the host drops it.

pub mod lifecycle;
pub mod plugin;
pub mod registry;

pub use lifecycle::PluginHandle;
pub use plugin::{Plugin, PluginInfo, PluginState};
pub use registry::PluginRegistry;

/// Plugin API version implemented by this host
pub const PLUGIN_API_VERSION: u32 = 1;
