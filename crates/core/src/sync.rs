//! Block definition synchronization
//!
//! Registry mutations are only state changes. A sync pass turns the state of
//! one definition into packets for the clients of every world holding it, and
//! sweeps definitions marked for removal.

use crate::block::{BlockDef, BlockDefs, DefHandle, DefState, DefStorage};
use crate::client::Client;
use crate::error::BlockError;
use crate::world::World;
use proto::{BlockId, BlockParams, Extension, Packet};

/// What happened to the memory of a swept definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reclaimed {
    /// The definition is still registered
    #[default]
    Nothing,
    /// An owned definition was dropped
    Freed,
    /// A static definition was released back to its owner
    Released,
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Define packets handed to clients
    pub defined: usize,
    /// Remove packets handed to clients
    pub removed: usize,
    /// Registry slots cleared
    pub slots_cleared: usize,
    pub reclaimed: Reclaimed,
}

impl SyncReport {
    pub fn packets(&self) -> usize {
        self.defined + self.removed
    }
}

/// Packet defining `def` at `id` for `client`, if the client can receive it.
pub fn definition_packet(client: &Client, id: BlockId, def: &BlockDef) -> Option<Packet> {
    if !client.can_receive(def) {
        return None;
    }

    let name = def.name.to_string();
    Some(match def.params {
        BlockParams::Extended(params) => Packet::DefineBlockExt { id, name, params },
        BlockParams::Basic(params) => Packet::DefineBlock { id, name, params },
    })
}

/// Run one sync pass for `handle`.
///
/// * undefined: every client of every world holding the definition receives
///   `RemoveBlockDefinition`, the slots are cleared and the definition leaves
///   the arena. Owned definitions are dropped; static ones are only forgotten.
/// * fresh or pending: every capable client of those worlds receives the
///   definition, after which it is synced.
/// * synced: nothing to do.
///
/// Clients are optional: with nobody connected the state change and the
/// reclamation still happen.
pub fn update_definition(
    defs: &mut BlockDefs,
    worlds: &mut [World],
    clients: &[Client],
    handle: DefHandle,
) -> Result<SyncReport, BlockError> {
    let state = defs.state(handle).ok_or(BlockError::StaleDefinition)?;
    let mut report = SyncReport::default();

    match state {
        DefState::Synced => {}
        DefState::Undefined => {
            for world in worlds.iter_mut() {
                let ids = world.blocks_mut().take_all(handle);
                let audience = clients
                    .iter()
                    .filter(|client| client.world() == world.id())
                    .filter(|client| client.supports(Extension::BlockDefinitions));

                for client in audience {
                    for &id in &ids {
                        if client.send(&Packet::RemoveBlockDefinition { id }) {
                            report.removed += 1;
                        }
                    }
                }
                report.slots_cleared += ids.len();
            }

            report.reclaimed = match defs.remove(handle) {
                Some(DefStorage::Owned(def)) => {
                    tracing::debug!("Freed block definition '{}'", def.name);
                    Reclaimed::Freed
                }
                Some(DefStorage::Borrowed(def)) => {
                    tracing::debug!("Released static block definition '{}'", def.name);
                    Reclaimed::Released
                }
                None => Reclaimed::Nothing,
            };
        }
        DefState::Fresh | DefState::Pending => {
            let def = defs.get(handle).ok_or(BlockError::StaleDefinition)?;

            for world in worlds.iter() {
                let ids = world.blocks().ids_of(handle);
                if ids.is_empty() {
                    continue;
                }

                for client in clients.iter().filter(|client| client.world() == world.id()) {
                    for &id in &ids {
                        let Some(packet) = definition_packet(client, id, def) else {
                            continue;
                        };
                        if client.send(&packet) {
                            report.defined += 1;
                        }
                    }
                }
            }

            defs.set_state(handle, DefState::Synced);
        }
    }

    tracing::debug!(
        "Synced {} ({}): {} defined, {} removed, {:?}",
        handle,
        state,
        report.defined,
        report.removed,
        report.reclaimed
    );
    Ok(report)
}

/// Join-time handshake: send every synced definition of `world` to `client`.
///
/// Fresh and pending definitions are left to the next sync pass, which
/// reaches the client once it is in the world.
///
/// Returns the number of packets sent.
pub fn send_world_definitions(defs: &BlockDefs, world: &World, client: &Client) -> usize {
    world
        .blocks()
        .entries()
        .into_iter()
        .filter(|&(_, handle)| defs.state(handle) == Some(DefState::Synced))
        .filter_map(|(id, handle)| defs.get(handle).map(|def| (id, def)))
        .filter_map(|(id, def)| definition_packet(client, id, def))
        .filter(|packet| client.send(packet))
        .count()
}
