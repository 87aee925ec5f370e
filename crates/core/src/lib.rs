//! Custom block definitions and plugin resource bunches for classic block game
//! servers.
//!
//! Plugins create [`BlockDef`]s (static or allocated), place them into world
//! registries and push them to clients with a sync pass. Event handlers and
//! commands are registered in bunches and retired symmetrically when the
//! plugin unloads.

#![warn(
    clippy::expect_used,
    clippy::unwrap_in_result,
    clippy::clone_on_ref_ptr,
    clippy::manual_let_else,
    clippy::trivially_copy_pass_by_ref
)]

pub mod block;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod plugin;
pub mod server;
pub mod sync;
pub mod world;

pub use block::{BlockDef, BlockDefs, DefHandle, DefState, DefStorage};
pub use client::{Client, ClientId, PacketSink, RecordingSink};
pub use command::{
    CommandBunch, CommandBunchHandle, CommandContext, CommandFailure, CommandFlags, CommandOutcome, CommandTable,
};
pub use config::{ConfigError, ServerConfig};
pub use error::{BlockError, CommandError, PluginError};
pub use event::{ChatMessage, Event, EventBunch, EventBunchHandle, EventBus, EventKind};
pub use plugin::{Plugin, PluginHandle, PluginInfo, PluginRegistry, PluginState, PLUGIN_API_VERSION};
pub use server::Server;
pub use sync::{Reclaimed, SyncReport};
pub use world::{BlockRegistry, World, WorldId};
