//! Integration tests for event and command bunches

use parking_lot::Mutex;
use proto::{MessageType, Packet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tessel::{
    Client, CommandBunch, CommandFlags, CommandOutcome, EventBunch, EventKind, RecordingSink, Server, WorldId,
};

const MAIN: WorldId = WorldId(0);

#[test]
fn test_nothing_invocable_after_unregister() {
    let mut server = Server::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let on_message = Arc::clone(&calls);
    let on_world = Arc::clone(&calls);
    let events = server.events_mut().register_bunch(
        EventBunch::new()
            .on_message(move |_, _| {
                on_message.fetch_add(1, Ordering::SeqCst);
            })
            .on_world_added(move |_, _| {
                on_world.fetch_add(1, Ordering::SeqCst);
            }),
    );
    let on_command = Arc::clone(&calls);
    let commands = server
        .commands_mut()
        .register_bunch(CommandBunch::new().command("count", CommandFlags::NONE, "", move |_| {
            on_command.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .expect("Failed to register commands");

    let alice = server.connect(Client::new("alice", RecordingSink::new()), MAIN).expect("Failed to connect");
    server.handle_chat(alice, "hi");
    server.add_world("second");
    assert_eq!(server.execute(Some(alice), "/count"), CommandOutcome::Executed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert_eq!(server.events_mut().unregister_bunch(events), 2);
    assert_eq!(server.commands_mut().unregister_bunch(commands), 1);

    server.handle_chat(alice, "hi");
    server.add_world("third");
    assert_eq!(server.execute(Some(alice), "/count"), CommandOutcome::Unknown);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(server.events_mut().is_empty());
    assert!(server.commands().is_empty());
}

#[test]
fn test_self_destroying_command_is_tolerated() {
    let mut server = Server::default();
    let handle = server
        .commands_mut()
        .register_bunch(
            CommandBunch::new()
                .command("stay", CommandFlags::NONE, "", |_| Ok(()))
                .command("vanish", CommandFlags::NONE, "", |ctx| {
                    let name = ctx.command.to_owned();
                    ctx.server.commands_mut().unregister(&name);
                    ctx.reply("gone");
                    Ok(())
                }),
        )
        .expect("Failed to register commands");

    let sink = RecordingSink::new();
    let bob = server.connect(Client::new("bob", sink.clone()), MAIN).expect("Failed to connect");

    assert_eq!(server.execute(Some(bob), "/vanish"), CommandOutcome::Executed);
    assert_eq!(server.execute(Some(bob), "/vanish"), CommandOutcome::Unknown);
    assert_eq!(
        sink.take()[0],
        Packet::Message { kind: MessageType::Chat, text: "gone".to_string() }
    );

    // Only the surviving command is left to remove
    assert_eq!(server.commands_mut().unregister_bunch(handle), 1);
    assert!(server.commands().is_empty());
}

#[test]
fn test_handlers_see_earlier_mutations_in_order() {
    let mut server = Server::default();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&seen);
    let second = Arc::clone(&seen);
    let _events = server.events_mut().register_bunch(
        EventBunch::new()
            .on_message(move |_, message| {
                first.lock().push(message.kind);
                message.kind = MessageType::Announcement;
            })
            .on_message(move |_, message| {
                second.lock().push(message.kind);
            }),
    );

    let carol = server.connect(Client::new("carol", RecordingSink::new()), MAIN).expect("Failed to connect");
    server.handle_chat(carol, "hello");

    assert_eq!(*seen.lock(), vec![MessageType::Chat, MessageType::Announcement]);
}

#[test]
fn test_handler_may_unregister_its_own_bunch() {
    let mut server = Server::default();
    let slot = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let own = Arc::clone(&slot);
    let counter = Arc::clone(&calls);
    let handle = server.events_mut().register_bunch(EventBunch::new().on_world_added(move |server, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = own.lock().take() {
            server.events_mut().unregister_bunch(handle);
        }
    }));
    *slot.lock() = Some(handle);

    server.add_world("one");
    server.add_world("two");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.events_mut().handler_count(EventKind::WorldAdded), 0);
}

#[test]
fn test_console_replies_and_caller_name() {
    let mut server = Server::default();
    let names = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&names);
    let _commands = server
        .commands_mut()
        .register("whoami", CommandFlags::NONE, "", move |ctx| {
            recorded.lock().push((ctx.caller_name(), ctx.args.map(str::to_owned)));
            Ok(())
        })
        .expect("Failed to register command");

    let dave = server.connect(Client::new("dave", RecordingSink::new()), MAIN).expect("Failed to connect");
    server.execute(None, "whoami");
    server.execute(Some(dave), "/WhoAmI  some  args ");

    assert_eq!(
        *names.lock(),
        vec![
            ("Console".to_string(), None),
            ("dave".to_string(), Some("some  args".to_string())),
        ]
    );
}
