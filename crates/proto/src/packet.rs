//! Clientbound packets produced by the block synchronization engine and the
//! chat pipeline.

use crate::block::{BasicParams, BlockId, ExtendedParams};

pub const ID_MESSAGE: u8 = 0x0d;
pub const ID_DEFINE_BLOCK: u8 = 0x23;
pub const ID_REMOVE_BLOCK_DEFINITION: u8 = 0x24;
pub const ID_DEFINE_BLOCK_EXT: u8 = 0x25;

/// Protocol extensions a client may announce during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    /// `BlockDefinitions` v1: `DefineBlock` and `RemoveBlockDefinition`.
    BlockDefinitions,
    /// `BlockDefinitionsExt` v2: `DefineBlockExt`.
    BlockDefinitionsExt,
    /// `MessageTypes` v1: chat messages may target other screen areas.
    MessageTypes,
}

impl Extension {
    /// Name announced in `ExtEntry`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BlockDefinitions => "BlockDefinitions",
            Self::BlockDefinitionsExt => "BlockDefinitionsExt",
            Self::MessageTypes => "MessageTypes",
        }
    }

    /// Version the server implements.
    pub const fn version(self) -> u32 {
        match self {
            Self::BlockDefinitionsExt => 2,
            Self::BlockDefinitions | Self::MessageTypes => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BlockDefinitions" => Some(Self::BlockDefinitions),
            "BlockDefinitionsExt" => Some(Self::BlockDefinitionsExt),
            "MessageTypes" => Some(Self::MessageTypes),
            _ => None,
        }
    }
}

/// Screen area a chat message is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MessageType {
    #[default]
    Chat = 0,
    Status1 = 1,
    Status2 = 2,
    Status3 = 3,
    BottomRight1 = 11,
    BottomRight2 = 12,
    BottomRight3 = 13,
    Announcement = 100,
    BigAnnouncement = 101,
    SmallAnnouncement = 102,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Chat,
            1 => Self::Status1,
            2 => Self::Status2,
            3 => Self::Status3,
            11 => Self::BottomRight1,
            12 => Self::BottomRight2,
            13 => Self::BottomRight3,
            100 => Self::Announcement,
            101 => Self::BigAnnouncement,
            102 => Self::SmallAnnouncement,
            other => return Err(other),
        })
    }
}

/// A clientbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Message {
        kind: MessageType,
        text: String,
    },
    DefineBlock {
        id: BlockId,
        name: String,
        params: BasicParams,
    },
    RemoveBlockDefinition {
        id: BlockId,
    },
    DefineBlockExt {
        id: BlockId,
        name: String,
        params: ExtendedParams,
    },
}

impl Packet {
    pub const fn packet_id(&self) -> u8 {
        match self {
            Self::Message { .. } => ID_MESSAGE,
            Self::DefineBlock { .. } => ID_DEFINE_BLOCK,
            Self::RemoveBlockDefinition { .. } => ID_REMOVE_BLOCK_DEFINITION,
            Self::DefineBlockExt { .. } => ID_DEFINE_BLOCK_EXT,
        }
    }

    /// Size on the wire including the packet id.
    pub const fn wire_size(&self) -> usize {
        wire_size(self.packet_id())
    }

    /// Extension the receiving client must support for this packet to be sent.
    pub const fn required_extension(&self) -> Option<Extension> {
        match self {
            Self::Message { .. } => None,
            Self::DefineBlock { .. } | Self::RemoveBlockDefinition { .. } => {
                Some(Extension::BlockDefinitions)
            }
            Self::DefineBlockExt { .. } => Some(Extension::BlockDefinitionsExt),
        }
    }

    /// Block id this packet refers to, if any.
    pub const fn block_id(&self) -> Option<BlockId> {
        match self {
            Self::DefineBlock { id, .. }
            | Self::RemoveBlockDefinition { id }
            | Self::DefineBlockExt { id, .. } => Some(*id),
            Self::Message { .. } => None,
        }
    }
}

/// Fixed wire size for a packet id, 0 for ids this crate does not know.
pub const fn wire_size(packet_id: u8) -> usize {
    match packet_id {
        ID_MESSAGE => 66,
        ID_DEFINE_BLOCK => 80,
        ID_REMOVE_BLOCK_DEFINITION => 2,
        ID_DEFINE_BLOCK_EXT => 88,
        _ => 0,
    }
}
