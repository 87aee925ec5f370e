//! Connected clients as seen by the block synchronization engine
//!
//! The transport is abstracted behind [`PacketSink`]; the host's networking
//! stack implements it for real connections.

use crate::block::BlockDef;
use crate::world::WorldId;
use bytes::Bytes;
use parking_lot::Mutex;
use proto::{Extension, MessageType, Packet, PacketCodec};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Identifier of a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Client({})", self.0)
    }
}

/// Outgoing half of a client connection
pub trait PacketSink: Send + Sync {
    fn send(&self, packet: &Packet) -> anyhow::Result<()>;
}

/// A client connected to the server
pub struct Client {
    id: ClientId,
    name: String,
    operator: bool,
    extensions: BTreeSet<Extension>,
    world: WorldId,
    sink: Arc<dyn PacketSink>,
}

impl Client {
    /// Create a client that has not joined a world yet.
    ///
    /// The id and world are assigned by [`crate::Server::connect`].
    pub fn new(name: impl Into<String>, sink: Arc<dyn PacketSink>) -> Self {
        Self {
            id: ClientId(0),
            name: name.into(),
            operator: false,
            extensions: BTreeSet::new(),
            world: WorldId(0),
            sink,
        }
    }

    /// Grant operator rights
    pub fn with_operator(mut self, operator: bool) -> Self {
        self.operator = operator;
        self
    }

    /// Record an extension announced during the handshake
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.insert(extension);
        self
    }

    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = Extension>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_op(&self) -> bool {
        self.operator
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn supports(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    /// Whether `def` can be defined for this client. Extended definitions
    /// need `BlockDefinitionsExt` on top of plain block definitions.
    pub fn can_receive(&self, def: &BlockDef) -> bool {
        if def.is_extended() {
            self.supports(Extension::BlockDefinitionsExt)
        } else {
            self.supports(Extension::BlockDefinitions)
        }
    }

    pub(crate) fn attach(&mut self, id: ClientId, world: WorldId) {
        self.id = id;
        self.world = world;
    }

    pub(crate) fn set_world(&mut self, world: WorldId) {
        self.world = world;
    }

    /// Send a packet, logging instead of failing when the transport refuses it.
    ///
    /// Returns whether the packet was handed to the transport.
    pub fn send(&self, packet: &Packet) -> bool {
        match self.sink.send(packet) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send packet 0x{:02x} to {}: {}", packet.packet_id(), self.name, e);
                false
            }
        }
    }

    /// Send a chat message. Clients without `MessageTypes` get everything in
    /// the normal chat area.
    pub fn send_message(&self, kind: MessageType, text: &str) -> bool {
        let kind = if self.supports(Extension::MessageTypes) { kind } else { MessageType::Chat };
        self.send(&Packet::Message { kind, text: text.to_owned() })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("operator", &self.operator)
            .field("extensions", &self.extensions)
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

/// Packet sink that encodes every packet and keeps the frames in memory.
///
/// Used as a loopback transport and to observe fan-out.
#[derive(Debug, Default)]
pub struct RecordingSink {
    codec: PacketCodec,
    frames: Mutex<Vec<Bytes>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Encoded frames in send order
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().clone()
    }

    /// Decoded packets in send order
    pub fn packets(&self) -> Vec<Packet> {
        let mut decoder = PacketCodec::new();
        for frame in self.frames.lock().iter() {
            decoder.add_data(frame);
        }

        match decoder.decode_all() {
            Ok(packets) => packets,
            Err(e) => {
                tracing::error!("Recorded frames failed to decode: {}", e);
                Vec::new()
            }
        }
    }

    /// Decoded packets, clearing the record
    pub fn take(&self) -> Vec<Packet> {
        let packets = self.packets();
        self.frames.lock().clear();
        packets
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }
}

impl PacketSink for RecordingSink {
    fn send(&self, packet: &Packet) -> anyhow::Result<()> {
        let frame = self.codec.encode(packet);
        self.frames.lock().push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedSink;

    impl PacketSink for ClosedSink {
        fn send(&self, _packet: &Packet) -> anyhow::Result<()> {
            anyhow::bail!("connection closed")
        }
    }

    #[test]
    fn test_message_type_downgrade() {
        let plain_sink = RecordingSink::new();
        let plain = Client::new("plain", plain_sink.clone());
        assert!(plain.send_message(MessageType::Announcement, "hi"));
        assert_eq!(
            plain_sink.take(),
            vec![Packet::Message { kind: MessageType::Chat, text: "hi".to_string() }]
        );

        let cpe_sink = RecordingSink::new();
        let cpe = Client::new("cpe", cpe_sink.clone()).with_extension(Extension::MessageTypes);
        cpe.send_message(MessageType::Announcement, "hi");
        assert_eq!(
            cpe_sink.take(),
            vec![Packet::Message { kind: MessageType::Announcement, text: "hi".to_string() }]
        );
        assert_eq!(cpe_sink.count(), 0);
    }

    #[test]
    fn test_failed_send_is_reported() {
        let client = Client::new("gone", Arc::new(ClosedSink));
        assert!(!client.send(&Packet::RemoveBlockDefinition { id: 47 }));
    }

    #[test]
    fn test_builder() {
        let client = Client::new("op", RecordingSink::new())
            .with_operator(true)
            .with_extensions([Extension::BlockDefinitions, Extension::BlockDefinitionsExt]);

        assert!(client.is_op());
        assert!(client.supports(Extension::BlockDefinitionsExt));
        assert!(!client.supports(Extension::MessageTypes));
    }
}
