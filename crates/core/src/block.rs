//! Custom block definitions and the arena that owns them
//!
//! A definition is either statically embedded in plugin code (borrowed, never
//! freed here) or allocated through [`BlockDefs::allocate`] (owned by the
//! arena and dropped by the sync pass that sweeps it). Handles carry a
//! generation so a handle to a swept definition can never reach a newer one.

use crate::error::BlockError;
use proto::{BlockId, BlockParams, ParamKind};
use std::borrow::Cow;

/// Longest name that survives the trip to the client.
pub const MAX_NAME_LENGTH: usize = 64;

/// Description of one custom block type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDef {
    /// Display name, borrowed for static definitions, owned for dynamic ones
    pub name: Cow<'static, str>,
    /// Standard block shown to clients without `BlockDefinitions`
    pub fallback: BlockId,
    pub params: BlockParams,
}

impl BlockDef {
    /// Definition suitable for a `static` item.
    pub const fn new_static(name: &'static str, fallback: BlockId, params: BlockParams) -> Self {
        Self {
            name: Cow::Borrowed(name),
            fallback,
            params,
        }
    }

    /// Definition with a copied name and zeroed parameters.
    pub fn new_owned(name: &str, kind: ParamKind) -> Self {
        Self {
            name: Cow::Owned(name.to_owned()),
            fallback: 0,
            params: BlockParams::zeroed(kind),
        }
    }

    pub fn is_extended(&self) -> bool {
        self.params.is_extended()
    }
}

/// Who is responsible for the memory of a definition.
#[derive(Debug)]
pub enum DefStorage {
    /// Allocated by the arena, freed by the sync pass that sweeps it
    Owned(Box<BlockDef>),
    /// Caller-owned, only observed
    Borrowed(&'static BlockDef),
}

impl DefStorage {
    pub fn def(&self) -> &BlockDef {
        match self {
            Self::Owned(def) => def,
            Self::Borrowed(def) => def,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

/// Synchronization state of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefState {
    /// Never broadcast since it was created
    Fresh,
    /// Changed since the last broadcast
    Pending,
    /// Clients have the current version
    Synced,
    /// Marked for removal, swept by the next sync pass
    Undefined,
}

impl DefState {
    /// Whether a sync pass has anything to broadcast.
    pub fn needs_broadcast(self) -> bool {
        matches!(self, Self::Fresh | Self::Pending)
    }

    pub fn is_active(self) -> bool {
        !matches!(self, Self::Undefined)
    }
}

impl std::fmt::Display for DefState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "Fresh"),
            Self::Pending => write!(f, "Pending"),
            Self::Synced => write!(f, "Synced"),
            Self::Undefined => write!(f, "Undefined"),
        }
    }
}

/// Generation-checked reference to a definition in [`BlockDefs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefHandle {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for DefHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockDef({}v{})", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Entry {
    storage: DefStorage,
    state: DefState,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Arena of every block definition known to the server.
#[derive(Debug, Default)]
pub struct BlockDefs {
    slots: Vec<Slot>,
    recycled: Vec<u32>,
}

impl BlockDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statically embedded definition. The arena never frees it.
    pub fn insert_static(&mut self, def: &'static BlockDef) -> DefHandle {
        self.insert(DefStorage::Borrowed(def))
    }

    /// Allocate a definition owned by the arena, with zeroed parameters.
    ///
    /// `name` is copied and need not outlive the call.
    pub fn allocate(&mut self, name: &str, kind: ParamKind) -> DefHandle {
        if name.len() > MAX_NAME_LENGTH {
            tracing::warn!("Block name '{}' exceeds {} bytes and will be truncated on the wire", name, MAX_NAME_LENGTH);
        }
        self.insert(DefStorage::Owned(Box::new(BlockDef::new_owned(name, kind))))
    }

    fn insert(&mut self, storage: DefStorage) -> DefHandle {
        let entry = Entry { storage, state: DefState::Fresh };

        let index = match self.recycled.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.entry = Some(entry);
        DefHandle { index, generation: slot.generation }
    }

    fn entry(&self, handle: DefHandle) -> Option<&Entry> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, handle: DefHandle) -> Option<&mut Entry> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn contains(&self, handle: DefHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// The definition, whatever its state.
    pub fn get(&self, handle: DefHandle) -> Option<&BlockDef> {
        self.entry(handle).map(|entry| entry.storage.def())
    }

    /// The definition unless it is marked for removal.
    pub fn get_active(&self, handle: DefHandle) -> Option<&BlockDef> {
        self.entry(handle)
            .filter(|entry| entry.state.is_active())
            .map(|entry| entry.storage.def())
    }

    /// Mutable access to an owned definition.
    ///
    /// Changes reach clients only after [`BlockDefs::mark_updated`] and a sync
    /// pass.
    pub fn get_mut(&mut self, handle: DefHandle) -> Result<&mut BlockDef, BlockError> {
        let entry = self.entry_mut(handle).ok_or(BlockError::StaleDefinition)?;
        match &mut entry.storage {
            DefStorage::Owned(def) => Ok(def.as_mut()),
            DefStorage::Borrowed(def) => Err(BlockError::Borrowed(def.name.to_string())),
        }
    }

    pub fn state(&self, handle: DefHandle) -> Option<DefState> {
        self.entry(handle).map(|entry| entry.state)
    }

    pub fn is_owned(&self, handle: DefHandle) -> Option<bool> {
        self.entry(handle).map(|entry| entry.storage.is_owned())
    }

    /// Flag a definition for rebroadcast on the next sync pass.
    pub fn mark_updated(&mut self, handle: DefHandle) -> Result<(), BlockError> {
        let entry = self.entry_mut(handle).ok_or(BlockError::StaleDefinition)?;
        if entry.state == DefState::Undefined {
            return Err(BlockError::Undefined(entry.storage.def().name.to_string()));
        }
        if entry.state == DefState::Synced {
            entry.state = DefState::Pending;
        }
        Ok(())
    }

    /// Flag a definition for removal. Slots stay occupied and memory is kept
    /// until the next sync pass.
    pub fn undefine(&mut self, handle: DefHandle) -> Result<(), BlockError> {
        let entry = self.entry_mut(handle).ok_or(BlockError::StaleDefinition)?;
        entry.state = DefState::Undefined;
        Ok(())
    }

    pub(crate) fn set_state(&mut self, handle: DefHandle, state: DefState) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.state = state;
        }
    }

    /// Drop the entry and invalidate every outstanding handle to it.
    pub(crate) fn remove(&mut self, handle: DefHandle) -> Option<DefStorage> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;

        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.recycled.push(handle.index);
        Some(entry.storage)
    }

    /// Number of live definitions.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
