//! Tessel Plugins
//!
//! Plugin implementations for the tessel host. The test plugin exercises
//! every part of the plugin surface: static and allocated block definitions,
//! an event bunch and a command bunch.

pub mod test_plugin;

// Re-export core plugin types for convenience
pub use tessel::plugin::{Plugin, PluginInfo, PluginState};

// Re-export plugin implementations
pub use test_plugin::{AnnounceToggle, PluginBlocks, TestPlugin};
