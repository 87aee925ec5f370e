//! Error types for the block registry, the command table and the plugin host

use crate::client::ClientId;
use crate::plugin::PluginState;
use crate::world::WorldId;
use proto::BlockId;
use thiserror::Error;

/// Misuse of the block definition API. None of these leave the registry in an
/// inconsistent state; the offending call is simply not applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("Block id {0} is reserved and cannot hold a custom definition")]
    ReservedId(BlockId),

    #[error("Block id {id} is already defined in world '{world}'")]
    Occupied { world: String, id: BlockId },

    #[error("World {0} does not exist")]
    UnknownWorld(WorldId),

    #[error("{0} is not connected")]
    UnknownClient(ClientId),

    #[error("Block definition handle is stale")]
    StaleDefinition,

    #[error("Block definition '{0}' is undefined")]
    Undefined(String),

    #[error("Block definition '{0}' is statically embedded and cannot be mutated")]
    Borrowed(String),
}

/// Errors raised while registering commands
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command '{0}' is already registered")]
    Collision(String),

    #[error("Invalid command name: '{0}'")]
    InvalidName(String),
}

/// Errors raised by the plugin host
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin '{name}' targets API version {found}, host provides {expected}")]
    ApiVersion { name: String, expected: u32, found: u32 },

    #[error("Plugin '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("Plugin '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Plugin '{name}' failed to load: {reason}")]
    LoadFailed { name: String, reason: String },

    #[error("Plugin '{0}' refused to unload")]
    UnloadRefused(String),

    #[error("Plugin '{name}' cannot transition from {from} to {to}")]
    InvalidTransition { name: String, from: PluginState, to: PluginState },
}
