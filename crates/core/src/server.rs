//! The host surface plugins program against
//!
//! Owns the worlds, the connected clients, the definition arena and the two
//! dispatch tables. Every operation runs on the caller's thread; handlers
//! receive `&mut Server` and may freely register or unregister while being
//! dispatched.

use crate::block::{BlockDef, BlockDefs, DefHandle, DefState};
use crate::client::{Client, ClientId};
use crate::command::{self, CommandContext, CommandFlags, CommandOutcome, CommandTable};
use crate::config::ServerConfig;
use crate::error::BlockError;
use crate::event::{ChatMessage, Event, EventBus};
use crate::sync::{self, SyncReport};
use crate::world::{World, WorldId};
use proto::{BlockId, MessageType};

pub struct Server {
    config: ServerConfig,
    worlds: Vec<World>,
    next_world: u32,
    clients: Vec<Client>,
    next_client: u32,
    blocks: BlockDefs,
    events: EventBus,
    commands: CommandTable,
}

impl Server {
    /// Create a server holding only the configured main world.
    pub fn new(config: ServerConfig) -> Self {
        let main = World::new(WorldId(0), config.server.main_world.clone());
        tracing::info!("Server '{}' created with main world '{}'", config.server.name, main.name());

        Self {
            config,
            worlds: vec![main],
            next_world: 1,
            clients: Vec::new(),
            next_client: 1,
            blocks: BlockDefs::new(),
            events: EventBus::new(),
            commands: CommandTable::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    // Worlds

    /// Add a world and fire [`Event::WorldAdded`].
    pub fn add_world(&mut self, name: impl Into<String>) -> WorldId {
        let id = WorldId(self.next_world);
        self.next_world += 1;

        let world = World::new(id, name);
        tracing::info!("Added world '{}' as {}", world.name(), id);
        self.worlds.push(world);

        self.fire(&mut Event::WorldAdded(id));
        id
    }

    /// Fire [`Event::WorldRemoved`], disconnect the world's clients and drop it.
    ///
    /// Definitions placed in the world stay in the arena.
    pub fn remove_world(&mut self, id: WorldId) -> Option<World> {
        self.world(id)?;
        self.fire(&mut Event::WorldRemoved(id));

        let residents: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|client| client.world() == id)
            .map(Client::id)
            .collect();
        for client in residents {
            self.disconnect(client);
        }

        let index = self.worlds.iter().position(|world| world.id() == id)?;
        let world = self.worlds.remove(index);
        tracing::info!("Removed world '{}'", world.name());
        Some(world)
    }

    pub fn world(&self, id: WorldId) -> Option<&World> {
        self.worlds.iter().find(|world| world.id() == id)
    }

    pub fn worlds(&self) -> &[World] {
        &self.worlds
    }

    /// Loaded worlds in load order
    pub fn world_ids(&self) -> Vec<WorldId> {
        self.worlds.iter().map(World::id).collect()
    }

    // Clients

    /// Attach a client to `world`, send it the world's active definitions and
    /// fire [`Event::ClientConnected`].
    pub fn connect(&mut self, mut client: Client, world: WorldId) -> Result<ClientId, BlockError> {
        let index = self
            .worlds
            .iter()
            .position(|candidate| candidate.id() == world)
            .ok_or(BlockError::UnknownWorld(world))?;

        let id = ClientId(self.next_client);
        self.next_client += 1;
        client.attach(id, world);

        let target = &self.worlds[index];
        let sent = sync::send_world_definitions(&self.blocks, target, &client);
        tracing::info!("{} '{}' joined '{}', {} definitions sent", id, client.name(), target.name(), sent);
        self.clients.push(client);

        self.fire(&mut Event::ClientConnected(id));
        Ok(id)
    }

    /// Move a client to another world and send that world's definitions.
    ///
    /// Returns the number of definitions sent.
    pub fn change_world(&mut self, id: ClientId, world: WorldId) -> Result<usize, BlockError> {
        let target = self
            .worlds
            .iter()
            .find(|candidate| candidate.id() == world)
            .ok_or(BlockError::UnknownWorld(world))?;

        let client = self
            .clients
            .iter_mut()
            .find(|client| client.id() == id)
            .ok_or(BlockError::UnknownClient(id))?;
        client.set_world(world);

        Ok(sync::send_world_definitions(&self.blocks, target, client))
    }

    pub fn disconnect(&mut self, id: ClientId) -> Option<Client> {
        let index = self.clients.iter().position(|client| client.id() == id)?;
        let client = self.clients.remove(index);
        tracing::info!("{} '{}' left", id, client.name());

        self.fire(&mut Event::ClientDisconnected(id));
        Some(client)
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|client| client.id() == id)
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    // Chat

    /// Send `text` to every connected client. Returns how many got it.
    pub fn broadcast(&self, kind: MessageType, text: &str) -> usize {
        self.clients
            .iter()
            .filter(|client| client.send_message(kind, text))
            .count()
    }

    pub fn send_message(&self, id: ClientId, kind: MessageType, text: &str) -> bool {
        self.client(id).is_some_and(|client| client.send_message(kind, text))
    }

    /// Chat pipeline: run the message handlers, then broadcast the result.
    ///
    /// Handlers may rewrite the text or the message type.
    pub fn handle_chat(&mut self, sender: ClientId, text: &str) -> Option<ChatMessage> {
        let Some(name) = self.client(sender).map(|client| client.name().to_owned()) else {
            tracing::warn!("Dropped chat from unknown {}", sender);
            return None;
        };

        let mut message = ChatMessage {
            sender,
            kind: MessageType::Chat,
            text: format!("{}: {}", name, text),
        };
        self.fire(&mut Event::Message(&mut message));

        self.broadcast(message.kind, &message.text);
        Some(message)
    }

    // Events and commands

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    /// Run every handler registered for the event's kind, in registration
    /// order. The handler list is fixed when dispatch starts.
    pub fn fire(&mut self, event: &mut Event<'_>) {
        for handler in self.events.handlers(event.kind()) {
            handler(self, event);
        }
    }

    /// Parse and run a command line on behalf of `caller` (`None` for the
    /// console). The caller is told about unknown commands, permission
    /// problems and failures.
    pub fn execute(&mut self, caller: Option<ClientId>, line: &str) -> CommandOutcome {
        let Some((name, args)) = command::parse_line(line) else {
            return CommandOutcome::Unknown;
        };

        let Some(entry) = self.commands.get(name).cloned() else {
            command::reply_to(self, caller, &self.config.commands.unknown_message);
            return CommandOutcome::Unknown;
        };

        if !self.permitted(caller, entry.flags) {
            tracing::debug!("Denied command '{}' to {:?}", entry.name, caller);
            command::reply_to(self, caller, &self.config.commands.denied_message);
            return CommandOutcome::Denied;
        }

        let mut ctx = CommandContext {
            server: self,
            caller,
            args,
            command: &entry.name,
        };

        match (entry.handler)(&mut ctx) {
            Ok(()) => CommandOutcome::Executed,
            Err(e) => {
                tracing::debug!("Command '{}' failed: {}", entry.name, e);
                command::reply_to(self, caller, &self.config.commands.failure_message);
                CommandOutcome::Failed
            }
        }
    }

    fn permitted(&self, caller: Option<ClientId>, flags: CommandFlags) -> bool {
        match caller {
            None => !flags.contains(CommandFlags::CLIENT),
            Some(id) => match self.client(id) {
                Some(client) => client.is_op() || !flags.contains(CommandFlags::OP),
                None => false,
            },
        }
    }

    // Block definitions

    pub fn blocks(&self) -> &BlockDefs {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut BlockDefs {
        &mut self.blocks
    }

    /// Place a definition at `id` in `world`.
    ///
    /// Clients only learn about it on the next [`Server::update_definition`].
    pub fn define_block(&mut self, world: WorldId, id: BlockId, handle: DefHandle) -> Result<(), BlockError> {
        let result = self.try_define_block(world, id, handle);
        if let Err(e) = &result {
            tracing::warn!("Cannot define block {} in {}: {}", id, world, e);
        }
        result
    }

    fn try_define_block(&mut self, world: WorldId, id: BlockId, handle: DefHandle) -> Result<(), BlockError> {
        let state = self.blocks.state(handle).ok_or(BlockError::StaleDefinition)?;
        if state == DefState::Undefined {
            let name = self.blocks.get(handle).map(|def| def.name.to_string()).unwrap_or_default();
            return Err(BlockError::Undefined(name));
        }

        self.worlds
            .iter_mut()
            .find(|candidate| candidate.id() == world)
            .ok_or(BlockError::UnknownWorld(world))?
            .define(id, handle)?;

        // The new slot must reach clients that already have the definition
        if state == DefState::Synced {
            self.blocks.mark_updated(handle)?;
        }
        Ok(())
    }

    /// Mark a definition for removal from every world. Slots stay occupied
    /// until the next [`Server::update_definition`].
    pub fn undefine_global(&mut self, handle: DefHandle) -> Result<(), BlockError> {
        let result = self.blocks.undefine(handle);
        if let Err(e) = &result {
            tracing::warn!("Cannot undefine {}: {}", handle, e);
        }
        result
    }

    /// Run a sync pass for one definition.
    pub fn update_definition(&mut self, handle: DefHandle) -> Result<SyncReport, BlockError> {
        let result = sync::update_definition(&mut self.blocks, &mut self.worlds, &self.clients, handle);
        if let Err(e) = &result {
            tracing::warn!("Cannot update {}: {}", handle, e);
        }
        result
    }

    /// Active definition at `id` in `world`
    pub fn lookup_block(&self, world: WorldId, id: BlockId) -> Option<&BlockDef> {
        let handle = self.world(world)?.blocks().get(id)?;
        self.blocks.get_active(handle)
    }

    /// Raw occupant of `id` in `world`, including definitions awaiting removal
    pub fn block_slot(&self, world: WorldId, id: BlockId) -> Option<DefHandle> {
        self.world(world)?.blocks().get(id)
    }

    /// Block id the client should be sent for `id` in its current world.
    pub fn block_for_client(&self, client: ClientId, id: BlockId) -> Option<BlockId> {
        let client = self.client(client)?;
        let world = self.world(client.world())?;
        Some(world.visible_block(&self.blocks, id, |def| client.can_receive(def)))
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.config.server.name)
            .field("worlds", &self.worlds.len())
            .field("clients", &self.clients.len())
            .field("definitions", &self.blocks.len())
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RecordingSink;
    use crate::command::CommandFailure;
    use crate::event::{EventBunch, EventKind};
    use proto::{Extension, Packet, ParamKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const MAIN: WorldId = WorldId(0);

    #[test]
    fn test_define_marks_synced_definitions_pending() {
        let mut server = Server::default();
        let handle = server.blocks_mut().allocate("x", ParamKind::Basic);
        server.define_block(MAIN, 47, handle).unwrap();
        server.update_definition(handle).unwrap();
        assert_eq!(server.blocks().state(handle), Some(DefState::Synced));

        let other = server.add_world("other");
        server.define_block(other, 47, handle).unwrap();
        assert_eq!(server.blocks().state(handle), Some(DefState::Pending));
    }

    #[test]
    fn test_define_errors_leave_state_alone() {
        let mut server = Server::default();
        let a = server.blocks_mut().allocate("a", ParamKind::Basic);
        let b = server.blocks_mut().allocate("b", ParamKind::Basic);

        server.define_block(MAIN, 47, a).unwrap();
        assert!(matches!(server.define_block(MAIN, 47, b), Err(BlockError::Occupied { id: 47, .. })));
        assert_eq!(server.define_block(MAIN, 0, b), Err(BlockError::ReservedId(0)));
        assert_eq!(server.define_block(WorldId(9), 50, b), Err(BlockError::UnknownWorld(WorldId(9))));

        server.undefine_global(b).unwrap();
        assert!(matches!(server.define_block(MAIN, 50, b), Err(BlockError::Undefined(_))));
        assert_eq!(server.block_slot(MAIN, 47), Some(a));
        assert!(server.block_slot(MAIN, 50).is_none());
    }

    #[test]
    fn test_world_events() {
        let mut server = Server::default();
        let added = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&added);
        let _handle = server.events_mut().register_bunch(
            EventBunch::new()
                .on_world_added(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .on_world_removed(|server, world| {
                    // The world is still present while its removal is announced
                    assert!(server.world(world).is_some());
                }),
        );

        let other = server.add_world("other");
        assert_eq!(added.load(Ordering::SeqCst), 1);
        assert_eq!(server.world_ids(), vec![MAIN, other]);

        assert_eq!(server.remove_world(other).unwrap().name(), "other");
        assert!(server.remove_world(other).is_none());
        assert_eq!(server.world_ids(), vec![MAIN]);
    }

    #[test]
    fn test_removing_a_world_disconnects_its_clients() {
        let mut server = Server::default();
        let other = server.add_world("other");
        let id = server.connect(Client::new("alice", RecordingSink::new()), other).unwrap();

        server.remove_world(other);
        assert!(server.client(id).is_none());
    }

    #[test]
    fn test_chat_pipeline_applies_handler_changes() {
        let mut server = Server::default();
        let sink = RecordingSink::new();
        let alice = server
            .connect(Client::new("alice", sink.clone()).with_extension(Extension::MessageTypes), MAIN)
            .unwrap();

        let _handle = server.events_mut().register(EventKind::Message, |_, event| {
            if let Event::Message(message) = event {
                message.kind = MessageType::Status1;
            }
        });

        let message = server.handle_chat(alice, "hello").unwrap();
        assert_eq!(message.kind, MessageType::Status1);
        assert_eq!(
            sink.take(),
            vec![Packet::Message { kind: MessageType::Status1, text: "alice: hello".to_string() }]
        );
        assert!(server.handle_chat(ClientId(99), "ghost").is_none());
    }

    #[test]
    fn test_command_permissions() {
        let mut server = Server::default();
        let _handle = server
            .commands_mut()
            .register_bunch(
                crate::command::CommandBunch::new()
                    .command("op", CommandFlags::OP, "", |_| Ok(()))
                    .command("client", CommandFlags::CLIENT, "", |_| Ok(()))
                    .command("fail", CommandFlags::NONE, "", |_| Err(CommandFailure)),
            )
            .unwrap();

        let sink = RecordingSink::new();
        let player = server.connect(Client::new("player", sink.clone()), MAIN).unwrap();
        let admin = server.connect(Client::new("admin", RecordingSink::new()).with_operator(true), MAIN).unwrap();

        assert_eq!(server.execute(None, "/op"), CommandOutcome::Executed);
        assert_eq!(server.execute(None, "/client"), CommandOutcome::Denied);
        assert_eq!(server.execute(Some(admin), "/OP"), CommandOutcome::Executed);
        assert_eq!(server.execute(Some(player), "/client"), CommandOutcome::Executed);

        assert_eq!(server.execute(Some(player), "/op"), CommandOutcome::Denied);
        assert_eq!(server.execute(Some(player), "/fail"), CommandOutcome::Failed);
        assert_eq!(server.execute(Some(player), "/missing"), CommandOutcome::Unknown);

        let texts: Vec<String> = sink
            .take()
            .into_iter()
            .filter_map(|packet| match packet {
                Packet::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        let replies = &server.config().commands;
        assert_eq!(texts, vec![
            replies.denied_message.clone(),
            replies.failure_message.clone(),
            replies.unknown_message.clone(),
        ]);
    }

    #[test]
    fn test_late_joiner_receives_active_definitions() {
        let mut server = Server::default();
        let handle = server.blocks_mut().allocate("x", ParamKind::Basic);
        server.define_block(MAIN, 47, handle).unwrap();
        server.update_definition(handle).unwrap();

        let sink = RecordingSink::new();
        server
            .connect(Client::new("late", sink.clone()).with_extension(Extension::BlockDefinitions), MAIN)
            .unwrap();
        assert!(matches!(sink.packets()[..], [Packet::DefineBlock { id: 47, .. }]));
    }
}
