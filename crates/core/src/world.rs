//! Worlds and their per-world block registries

use crate::block::{BlockDef, BlockDefs, DefHandle};
use crate::error::BlockError;
use nohash_hasher::IntMap;
use proto::{BlockId, BLOCK_AIR};

/// Identifier of a loaded world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(pub u32);

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "World({})", self.0)
    }
}

/// Mapping from block id to the definition occupying it.
///
/// The registry stores handles only; the definitions themselves live in
/// [`BlockDefs`] so one definition can occupy slots in several worlds.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    slots: IntMap<BlockId, DefHandle>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy `id` with `handle`. Fails without side effects if the id is
    /// reserved or already occupied.
    pub fn insert(&mut self, world: &str, id: BlockId, handle: DefHandle) -> Result<(), BlockError> {
        if id == BLOCK_AIR {
            return Err(BlockError::ReservedId(id));
        }
        if self.slots.contains_key(&id) {
            return Err(BlockError::Occupied { world: world.to_owned(), id });
        }

        self.slots.insert(id, handle);
        Ok(())
    }

    /// Occupant of `id`, including definitions marked for removal
    pub fn get(&self, id: BlockId) -> Option<DefHandle> {
        self.slots.get(&id).copied()
    }

    pub fn is_occupied(&self, id: BlockId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Every id occupied by `handle`, ascending.
    pub fn ids_of(&self, handle: DefHandle) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self
            .slots
            .iter()
            .filter(|(_, occupant)| **occupant == handle)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Clear every slot occupied by `handle` and return the freed ids, ascending.
    pub fn take_all(&mut self, handle: DefHandle) -> Vec<BlockId> {
        let ids = self.ids_of(handle);
        for id in &ids {
            self.slots.remove(id);
        }
        ids
    }

    /// All occupied slots ordered by id.
    pub fn entries(&self) -> Vec<(BlockId, DefHandle)> {
        let mut entries: Vec<_> = self.slots.iter().map(|(id, handle)| (*id, *handle)).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A loaded world. Terrain storage belongs to the host; only the custom block
/// table is modelled here.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    name: String,
    blocks: BlockRegistry,
}

impl World {
    pub fn new(id: WorldId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            blocks: BlockRegistry::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut BlockRegistry {
        &mut self.blocks
    }

    /// Occupy `id` in this world's registry with `handle`.
    pub fn define(&mut self, id: BlockId, handle: DefHandle) -> Result<(), BlockError> {
        self.blocks.insert(&self.name, id, handle)
    }

    /// Block id a client should see in place of `id`.
    ///
    /// `receives` tells whether the client can be sent a given definition.
    /// When it cannot, the client gets the fallback of whatever definition
    /// occupies the slot, even one awaiting removal. Empty slots show `id`.
    pub fn visible_block(&self, defs: &BlockDefs, id: BlockId, receives: impl Fn(&BlockDef) -> bool) -> BlockId {
        match self.blocks.get(id).and_then(|handle| defs.get(handle)) {
            Some(def) if !receives(def) => def.fallback,
            _ => id,
        }
    }
}
