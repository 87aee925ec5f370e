//! Integration tests for block definition synchronization
//!
//! These tests drive the public server surface the way a plugin does and
//! observe what connected clients receive on the wire.

use proto::{BasicParams, BlockParams, Extension, Packet, ParamKind, Solidity};
use std::sync::Arc;
use tessel::{BlockDef, BlockError, Client, ClientId, DefState, Reclaimed, RecordingSink, Server, WorldId};

const MAIN: WorldId = WorldId(0);

static STONE_LIKE: BlockDef = BlockDef::new_static(
    "Stone-like",
    1,
    BlockParams::Basic(BasicParams { solidity: Solidity::Solid, top_tex: 1, ..BasicParams::ZEROED }),
);

fn cpe_client(name: &str, sink: &Arc<RecordingSink>) -> Client {
    Client::new(name, sink.clone()).with_extensions([Extension::BlockDefinitions, Extension::BlockDefinitionsExt])
}

#[test]
fn test_undefine_then_sync_removes_and_frees() {
    let mut server = Server::default();
    let early = RecordingSink::new();
    server.connect(cpe_client("early", &early), MAIN).expect("Failed to connect");

    let handle = server.blocks_mut().allocate("Temporary", ParamKind::Basic);
    server.define_block(MAIN, 60, handle).expect("Failed to define");
    let report = server.update_definition(handle).expect("Failed to sync");
    assert_eq!(report.defined, 1);
    assert!(matches!(early.take()[..], [Packet::DefineBlock { id: 60, .. }]));

    server.undefine_global(handle).expect("Failed to undefine");
    // Slot still occupied but no longer active before the sync pass
    assert_eq!(server.block_slot(MAIN, 60), Some(handle));
    assert!(server.lookup_block(MAIN, 60).is_none());

    let report = server.update_definition(handle).expect("Failed to sync");
    assert_eq!(report.removed, 1);
    assert_eq!(report.reclaimed, Reclaimed::Freed);
    assert_eq!(early.take(), vec![Packet::RemoveBlockDefinition { id: 60 }]);
    assert!(server.block_slot(MAIN, 60).is_none());
    assert!(!server.blocks().contains(handle));

    let replacement = server.blocks_mut().allocate("Replacement", ParamKind::Basic);
    assert_ne!(replacement, handle);

    let late = RecordingSink::new();
    server.connect(cpe_client("late", &late), MAIN).expect("Failed to connect");
    assert_eq!(late.count(), 0);
}

#[test]
fn test_second_sync_sends_nothing() {
    let mut server = Server::default();
    let sink = RecordingSink::new();
    server.connect(cpe_client("alice", &sink), MAIN).expect("Failed to connect");

    let handle = server.blocks_mut().insert_static(&STONE_LIKE);
    server.define_block(MAIN, 47, handle).expect("Failed to define");

    assert_eq!(server.update_definition(handle).expect("Failed to sync").packets(), 1);
    assert_eq!(server.update_definition(handle).expect("Failed to sync").packets(), 0);
    assert_eq!(sink.count(), 1);
}

#[test]
fn test_mutation_is_rebroadcast_after_mark_updated() {
    let mut server = Server::default();
    let sink = RecordingSink::new();
    server.connect(cpe_client("alice", &sink), MAIN).expect("Failed to connect");

    let handle = server.blocks_mut().allocate("Glass", ParamKind::Basic);
    server.define_block(MAIN, 50, handle).expect("Failed to define");
    server.update_definition(handle).expect("Failed to sync");
    sink.take();

    if let BlockParams::Basic(params) = &mut server.blocks_mut().get_mut(handle).expect("Owned definition").params {
        params.transmits_light = true;
    }
    // Not marked yet, so nothing goes out
    assert_eq!(server.update_definition(handle).expect("Failed to sync").packets(), 0);

    server.blocks_mut().mark_updated(handle).expect("Failed to mark");
    server.update_definition(handle).expect("Failed to sync");
    match &sink.take()[..] {
        [Packet::DefineBlock { id: 50, params, .. }] => assert!(params.transmits_light),
        other => panic!("unexpected packets: {:?}", other),
    }
}

#[test]
fn test_allocated_definition_is_freed_exactly_once() {
    let mut server = Server::default();
    let handle = server.blocks_mut().allocate("x", ParamKind::Extended);
    server.define_block(MAIN, 70, handle).expect("Failed to define");
    server.undefine_global(handle).expect("Failed to undefine");

    let report = server.update_definition(handle).expect("Failed to sync");
    assert_eq!(report.reclaimed, Reclaimed::Freed);
    assert_eq!(server.update_definition(handle), Err(BlockError::StaleDefinition));
    assert_eq!(server.undefine_global(handle), Err(BlockError::StaleDefinition));
    assert!(server.blocks().is_empty());
}

#[test]
fn test_static_definition_is_released_not_freed() {
    let mut server = Server::default();
    let handle = server.blocks_mut().insert_static(&STONE_LIKE);
    server.define_block(MAIN, 47, handle).expect("Failed to define");
    server.undefine_global(handle).expect("Failed to undefine");

    let report = server.update_definition(handle).expect("Failed to sync");
    assert_eq!(report.reclaimed, Reclaimed::Released);
    assert_eq!(STONE_LIKE.name, "Stone-like");

    // The same static can be installed again
    let again = server.blocks_mut().insert_static(&STONE_LIKE);
    server.define_block(MAIN, 47, again).expect("Failed to define again");
    assert_eq!(server.lookup_block(MAIN, 47).map(|def| def.fallback), Some(1));
}

#[test]
fn test_one_definition_in_many_worlds() {
    let mut server = Server::default();
    let other = server.add_world("other");

    let main_sink = RecordingSink::new();
    let other_sink = RecordingSink::new();
    server.connect(cpe_client("main", &main_sink), MAIN).expect("Failed to connect");
    server.connect(cpe_client("other", &other_sink), other).expect("Failed to connect");

    let handle = server.blocks_mut().insert_static(&STONE_LIKE);
    for world in server.world_ids() {
        server.define_block(world, 47, handle).expect("Failed to define");
    }
    assert_eq!(server.update_definition(handle).expect("Failed to sync").defined, 2);

    server.undefine_global(handle).expect("Failed to undefine");
    let report = server.update_definition(handle).expect("Failed to sync");
    assert_eq!(report.removed, 2);
    assert_eq!(report.slots_cleared, 2);
    assert_eq!(main_sink.packets().last(), Some(&Packet::RemoveBlockDefinition { id: 47 }));
    assert_eq!(other_sink.packets().last(), Some(&Packet::RemoveBlockDefinition { id: 47 }));
}

#[test]
fn test_clients_without_extension_get_nothing_and_see_fallback() {
    let mut server = Server::default();
    let plain_sink = RecordingSink::new();
    let plain = server.connect(Client::new("plain", plain_sink.clone()), MAIN).expect("Failed to connect");
    let cpe_sink = RecordingSink::new();
    let cpe = server.connect(cpe_client("cpe", &cpe_sink), MAIN).expect("Failed to connect");

    let handle = server.blocks_mut().insert_static(&STONE_LIKE);
    server.define_block(MAIN, 47, handle).expect("Failed to define");
    server.update_definition(handle).expect("Failed to sync");

    assert_eq!(plain_sink.count(), 0);
    assert_eq!(cpe_sink.count(), 1);
    assert_eq!(server.block_for_client(plain, 47), Some(1));
    assert_eq!(server.block_for_client(cpe, 47), Some(47));
    assert_eq!(server.block_for_client(plain, 5), Some(5));
}

#[test]
fn test_basic_only_client_skips_extended_definitions() {
    let mut server = Server::default();
    let sink = RecordingSink::new();
    let basic = server
        .connect(Client::new("basic", sink.clone()).with_extension(Extension::BlockDefinitions), MAIN)
        .expect("Failed to connect");

    let handle = server.blocks_mut().allocate("Slab", ParamKind::Extended);
    server.blocks_mut().get_mut(handle).expect("Owned definition").fallback = 2;
    server.define_block(MAIN, 48, handle).expect("Failed to define");
    let report = server.update_definition(handle).expect("Failed to sync");

    assert_eq!(report.defined, 0);
    assert_eq!(server.blocks().state(handle), Some(DefState::Synced));
    assert_eq!(sink.count(), 0);
    // Never told about the extended definition, so it sees the standard block
    assert_eq!(server.block_for_client(basic, 48), Some(2));

    // Removal still reaches every client holding BlockDefinitions
    server.undefine_global(handle).expect("Failed to undefine");
    server.update_definition(handle).expect("Failed to sync");
    assert_eq!(sink.take(), vec![Packet::RemoveBlockDefinition { id: 48 }]);
}

#[test]
fn test_change_world_sends_target_definitions() {
    let mut server = Server::default();
    let other = server.add_world("other");
    let handle = server.blocks_mut().insert_static(&STONE_LIKE);
    server.define_block(other, 47, handle).expect("Failed to define");
    server.update_definition(handle).expect("Failed to sync");

    let sink = RecordingSink::new();
    let id = server.connect(cpe_client("traveller", &sink), MAIN).expect("Failed to connect");
    assert_eq!(sink.count(), 0);

    assert_eq!(server.change_world(id, other), Ok(1));
    assert!(matches!(sink.packets()[..], [Packet::DefineBlock { id: 47, .. }]));
    assert_eq!(server.change_world(id, WorldId(42)), Err(BlockError::UnknownWorld(WorldId(42))));
    assert_eq!(server.change_world(ClientId(999), other), Err(BlockError::UnknownClient(ClientId(999))));
}

#[test]
fn test_unsynced_definition_is_sent_to_a_joiner_once() {
    let mut server = Server::default();
    let handle = server.blocks_mut().insert_static(&STONE_LIKE);
    server.define_block(MAIN, 47, handle).expect("Failed to define");

    let sink = RecordingSink::new();
    server.connect(cpe_client("early", &sink), MAIN).expect("Failed to connect");
    assert_eq!(sink.count(), 0);

    server.update_definition(handle).expect("Failed to sync");
    let defines = sink.packets().iter().filter(|packet| matches!(packet, Packet::DefineBlock { .. })).count();
    assert_eq!(defines, 1);
}
