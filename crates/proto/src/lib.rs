//! Classic protocol extension packets for tessel
//!
//! This crate provides the block parameter types and the clientbound packets
//! used to define, update and retract custom block types (`BlockDefinitions`
//! and `BlockDefinitionsExt`), plus the `Message` packet used by the chat
//! pipeline. Encoding follows the fixed-size CPE layouts bit for bit.

#![warn(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::if_then_some_else_none,
    clippy::let_underscore_untyped,
    clippy::missing_assert_message,
    clippy::unwrap_in_result,
    clippy::unwrap_used,
    clippy::str_to_string,
    clippy::clone_on_ref_ptr,
    clippy::default_trait_access,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::manual_let_else,
    clippy::match_bool,
    clippy::redundant_closure_for_method_calls,
    clippy::trivially_copy_pass_by_ref,
    clippy::unused_self
)]
#![allow(clippy::use_self)]

pub mod block;
pub mod codec;
pub mod error;
pub mod packet;

pub use block::{
    BasicParams, BlockId, BlockParams, DrawMode, ExtendedParams, ParamKind, Solidity, WalkSound,
    BLOCK_AIR, MAX_BLOCKS, STANDARD_BLOCK_COUNT,
};
pub use codec::PacketCodec;
pub use error::ProtoError;
pub use packet::{Extension, MessageType, Packet};
