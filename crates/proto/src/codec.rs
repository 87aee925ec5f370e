//! Packet codec for the block definition packets
//!
//! Every packet handled here has a fixed size determined by its id, so framing
//! needs no length prefix: the decoder waits until a whole packet is buffered.

use crate::block::{BasicParams, DrawMode, ExtendedParams, Solidity, WalkSound};
use crate::error::{ProtoError, Result};
use crate::packet::{
    self, MessageType, Packet, ID_DEFINE_BLOCK, ID_DEFINE_BLOCK_EXT, ID_MESSAGE,
    ID_REMOVE_BLOCK_DEFINITION,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Length of every protocol string.
pub const STRING_LENGTH: usize = 64;

/// Packet codec for encoding and decoding block definition traffic
#[derive(Debug)]
pub struct PacketCodec {
    /// Decoder buffer
    buffer: BytesMut,
}

impl Clone for PacketCodec {
    fn clone(&self) -> Self {
        Self {
            buffer: BytesMut::new(), // Start with empty buffer for clone
        }
    }
}

impl PacketCodec {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Encode a packet to bytes
    pub fn encode(&self, packet: &Packet) -> Bytes {
        let mut buf = BytesMut::with_capacity(packet.wire_size());
        encode_into(packet, &mut buf);
        buf.freeze()
    }

    /// Add data to the decoder buffer
    pub fn add_data(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a packet from the buffer
    ///
    /// Returns `Ok(None)` until a complete packet is available.
    pub fn decode(&mut self) -> Result<Option<Packet>> {
        let Some(&packet_id) = self.buffer.first() else {
            return Ok(None);
        };

        let size = packet::wire_size(packet_id);
        if size == 0 {
            tracing::warn!("Unknown packet id 0x{:02x}, discarding {} buffered bytes", packet_id, self.buffer.len());
            self.buffer.clear();
            return Err(ProtoError::UnknownPacket(packet_id));
        }
        if self.buffer.len() < size {
            return Ok(None);
        }

        let mut frame = self.buffer.split_to(size).freeze();
        decode_frame(&mut frame).map(Some)
    }

    /// Decode every complete packet currently buffered
    pub fn decode_all(&mut self) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();

        while let Some(packet) = self.decode()? {
            packets.push(packet);
        }

        Ok(packets)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Append the wire form of `packet` to `buf`.
pub fn encode_into(packet: &Packet, buf: &mut BytesMut) {
    buf.put_u8(packet.packet_id());

    match packet {
        Packet::Message { kind, text } => {
            buf.put_u8(*kind as u8);
            put_string(buf, text);
        }
        Packet::DefineBlock { id, name, params } => {
            buf.put_u8(*id);
            put_string(buf, name);
            put_basic(buf, params);
        }
        Packet::RemoveBlockDefinition { id } => {
            buf.put_u8(*id);
        }
        Packet::DefineBlockExt { id, name, params } => {
            buf.put_u8(*id);
            put_string(buf, name);
            put_extended(buf, params);
        }
    }
}

/// Decode one complete frame, packet id included.
pub fn decode_frame(buf: &mut Bytes) -> Result<Packet> {
    if !buf.has_remaining() {
        return Err(ProtoError::BufferUnderflow { expected: 1, actual: 0 });
    }

    let packet_id = buf[0];
    let expected = packet::wire_size(packet_id);
    if expected == 0 {
        return Err(ProtoError::UnknownPacket(packet_id));
    }
    if buf.remaining() < expected {
        return Err(ProtoError::BufferUnderflow { expected, actual: buf.remaining() });
    }
    buf.advance(1);

    let packet = match packet_id {
        ID_MESSAGE => {
            let kind = field("message type", buf.get_u8(), MessageType::try_from)?;
            Packet::Message { kind, text: get_string(buf) }
        }
        ID_DEFINE_BLOCK => Packet::DefineBlock {
            id: buf.get_u8(),
            name: get_string(buf),
            params: get_basic(buf)?,
        },
        ID_REMOVE_BLOCK_DEFINITION => Packet::RemoveBlockDefinition { id: buf.get_u8() },
        ID_DEFINE_BLOCK_EXT => Packet::DefineBlockExt {
            id: buf.get_u8(),
            name: get_string(buf),
            params: get_extended(buf)?,
        },
        other => return Err(ProtoError::UnknownPacket(other)),
    };

    Ok(packet)
}

/// Write a space padded 64 byte string. Non-ASCII characters become `?`.
fn put_string(buf: &mut BytesMut, text: &str) {
    let mut written = 0;
    for ch in text.chars().take(STRING_LENGTH) {
        buf.put_u8(if ch.is_ascii() { ch as u8 } else { b'?' });
        written += 1;
    }
    buf.put_bytes(b' ', STRING_LENGTH - written);
}

fn get_string(buf: &mut Bytes) -> String {
    let raw = buf.split_to(STRING_LENGTH);
    String::from_utf8_lossy(&raw).trim_end_matches(' ').to_owned()
}

fn field<T>(name: &'static str, value: u8, convert: impl FnOnce(u8) -> std::result::Result<T, u8>) -> Result<T> {
    convert(value).map_err(|value| ProtoError::InvalidField { field: name, value })
}

fn put_basic(buf: &mut BytesMut, p: &BasicParams) {
    buf.put_u8(p.solidity as u8);
    buf.put_u8(p.move_speed);
    buf.put_u8(p.top_tex);
    buf.put_u8(p.side_tex);
    buf.put_u8(p.bottom_tex);
    buf.put_u8(u8::from(p.transmits_light));
    buf.put_u8(p.walk_sound as u8);
    buf.put_u8(u8::from(p.full_bright));
    buf.put_u8(p.shape);
    buf.put_u8(p.draw_mode as u8);
    buf.put_u8(p.fog_density);
    buf.put_u8(p.fog_r);
    buf.put_u8(p.fog_g);
    buf.put_u8(p.fog_b);
}

fn get_basic(buf: &mut Bytes) -> Result<BasicParams> {
    Ok(BasicParams {
        solidity: field("solidity", buf.get_u8(), Solidity::try_from)?,
        move_speed: buf.get_u8(),
        top_tex: buf.get_u8(),
        side_tex: buf.get_u8(),
        bottom_tex: buf.get_u8(),
        transmits_light: buf.get_u8() != 0,
        walk_sound: field("walk sound", buf.get_u8(), WalkSound::try_from)?,
        full_bright: buf.get_u8() != 0,
        shape: buf.get_u8(),
        draw_mode: field("draw mode", buf.get_u8(), DrawMode::try_from)?,
        fog_density: buf.get_u8(),
        fog_r: buf.get_u8(),
        fog_g: buf.get_u8(),
        fog_b: buf.get_u8(),
    })
}

fn put_extended(buf: &mut BytesMut, p: &ExtendedParams) {
    buf.put_u8(p.solidity as u8);
    buf.put_u8(p.move_speed);
    buf.put_u8(p.top_tex);
    buf.put_u8(p.left_tex);
    buf.put_u8(p.right_tex);
    buf.put_u8(p.front_tex);
    buf.put_u8(p.back_tex);
    buf.put_u8(p.bottom_tex);
    buf.put_u8(u8::from(p.transmits_light));
    buf.put_u8(p.walk_sound as u8);
    buf.put_u8(u8::from(p.full_bright));
    buf.put_slice(&[p.min_x, p.min_y, p.min_z, p.max_x, p.max_y, p.max_z]);
    buf.put_u8(p.draw_mode as u8);
    buf.put_u8(p.fog_density);
    buf.put_u8(p.fog_r);
    buf.put_u8(p.fog_g);
    buf.put_u8(p.fog_b);
}

fn get_extended(buf: &mut Bytes) -> Result<ExtendedParams> {
    Ok(ExtendedParams {
        solidity: field("solidity", buf.get_u8(), Solidity::try_from)?,
        move_speed: buf.get_u8(),
        top_tex: buf.get_u8(),
        left_tex: buf.get_u8(),
        right_tex: buf.get_u8(),
        front_tex: buf.get_u8(),
        back_tex: buf.get_u8(),
        bottom_tex: buf.get_u8(),
        transmits_light: buf.get_u8() != 0,
        walk_sound: field("walk sound", buf.get_u8(), WalkSound::try_from)?,
        full_bright: buf.get_u8() != 0,
        min_x: buf.get_u8(),
        min_y: buf.get_u8(),
        min_z: buf.get_u8(),
        max_x: buf.get_u8(),
        max_y: buf.get_u8(),
        max_z: buf.get_u8(),
        draw_mode: field("draw mode", buf.get_u8(), DrawMode::try_from)?,
        fog_density: buf.get_u8(),
        fog_r: buf.get_u8(),
        fog_g: buf.get_u8(),
        fog_b: buf.get_u8(),
    })
}
