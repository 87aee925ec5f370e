//! Minimal plugin showing how custom blocks, events and commands are wired.
//!
//! Two blocks are embedded statically and one is allocated at load time. All
//! three are defined in every world, including worlds added later. Chat can be
//! promoted to announcements with `/atoggle`.

use anyhow::Result;
use proto::{BasicParams, BlockId, BlockParams, DrawMode, ExtendedParams, MessageType, ParamKind, Solidity, WalkSound};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessel::{
    BlockDef, CommandBunch, CommandBunchHandle, CommandFailure, CommandFlags, DefHandle, EventBunch,
    EventBunchHandle, Plugin, PluginInfo, Server, WorldId,
};

/// Shown to clients without custom block support
pub const FALLBACK_BLOCK_ID: BlockId = 1;
pub const FALLBACK_BLOCK_ID_EXT: BlockId = 2;

pub const BLOCK_ID: BlockId = 47;
pub const BLOCK_ID_EXT: BlockId = 48;
pub const BLOCK_ID_DYN: BlockId = 49;

pub static MY_BLOCK: BlockDef = BlockDef::new_static(
    "My test block",
    FALLBACK_BLOCK_ID,
    BlockParams::Basic(BasicParams {
        solidity: Solidity::Solid,
        move_speed: 255,
        top_tex: 8,
        side_tex: 14,
        bottom_tex: 80,
        transmits_light: false,
        walk_sound: WalkSound::Stone,
        full_bright: false,
        shape: 8,
        draw_mode: DrawMode::Opaque,
        fog_density: 0,
        fog_r: 0,
        fog_g: 0,
        fog_b: 0,
    }),
);

pub static MY_EXTENDED_BLOCK: BlockDef = BlockDef::new_static(
    "My extended test block",
    FALLBACK_BLOCK_ID_EXT,
    BlockParams::Extended(ExtendedParams {
        solidity: Solidity::Swim,
        move_speed: 10,
        top_tex: 17,
        left_tex: 37,
        right_tex: 53,
        front_tex: 51,
        back_tex: 35,
        bottom_tex: 49,
        transmits_light: false,
        walk_sound: WalkSound::Grass,
        full_bright: false,
        min_x: 10,
        min_y: 10,
        min_z: 10,
        max_x: 13,
        max_y: 13,
        max_z: 13,
        draw_mode: DrawMode::Opaque,
        fog_density: 127,
        fog_r: 0,
        fog_g: 0,
        fog_b: 0,
    }),
);

pub const DYNAMIC_BLOCK_NAME: &str = "My dynamic test block";

/// Whether player chat is promoted to announcements
#[derive(Debug, Default)]
pub struct AnnounceToggle(AtomicBool);

impl AnnounceToggle {
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Flip the toggle and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Handles of the definitions this plugin installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginBlocks {
    pub basic: DefHandle,
    pub extended: DefHandle,
    pub dynamic: DefHandle,
}

impl PluginBlocks {
    fn install(server: &mut Server) -> Result<Self> {
        let defs = server.blocks_mut();
        let basic = defs.insert_static(&MY_BLOCK);
        let extended = defs.insert_static(&MY_EXTENDED_BLOCK);

        let dynamic = defs.allocate(DYNAMIC_BLOCK_NAME, ParamKind::Basic);
        let def = defs.get_mut(dynamic)?;
        def.fallback = FALLBACK_BLOCK_ID;
        def.params = BlockParams::Basic(BasicParams {
            solidity: Solidity::Solid,
            move_speed: 128,
            top_tex: 4,
            side_tex: 4,
            bottom_tex: 4,
            walk_sound: WalkSound::Wood,
            shape: 16,
            ..BasicParams::ZEROED
        });

        Ok(Self { basic, extended, dynamic })
    }

    /// Sync order and placement of every definition
    pub fn placements(&self) -> [(BlockId, DefHandle); 3] {
        [(BLOCK_ID, self.basic), (BLOCK_ID_EXT, self.extended), (BLOCK_ID_DYN, self.dynamic)]
    }

    fn define_in(&self, server: &mut Server, world: WorldId) {
        for (id, handle) in self.placements() {
            if let Err(e) = server.define_block(world, id, handle) {
                tracing::debug!("Block {} left out of {}: {}", id, world, e);
            }
        }
    }

    fn sync(&self, server: &mut Server) -> Result<()> {
        for (_, handle) in self.placements() {
            server.update_definition(handle)?;
        }
        Ok(())
    }
}

/// Sample plugin exercising blocks, events and commands
#[derive(Debug, Default)]
pub struct TestPlugin {
    toggle: Arc<AnnounceToggle>,
    blocks: Option<PluginBlocks>,
    events: Option<EventBunchHandle>,
    commands: Option<CommandBunchHandle>,
}

impl TestPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&self) -> &Arc<AnnounceToggle> {
        &self.toggle
    }

    pub fn blocks(&self) -> Option<PluginBlocks> {
        self.blocks
    }

    fn events(&self, blocks: PluginBlocks) -> EventBunch {
        let toggle = Arc::clone(&self.toggle);

        EventBunch::new()
            .on_message(move |_, message| {
                if toggle.is_enabled() {
                    message.kind = MessageType::Announcement;
                }
            })
            .on_world_added(move |server, world| {
                blocks.define_in(server, world);
                if let Err(e) = blocks.sync(server) {
                    tracing::warn!("Failed to sync test blocks for {}: {}", world, e);
                }
            })
    }

    fn commands(&self) -> CommandBunch {
        let toggle = Arc::clone(&self.toggle);

        CommandBunch::new()
            .command("PlugTest", CommandFlags::NONE, "Checks that the test plugin is loaded", |ctx| {
                ctx.reply("This command registered by testplugin.");
                Ok(())
            })
            .command("Atoggle", CommandFlags::OP, "Toggles announce chat", move |ctx| {
                let state = if toggle.toggle() { "&aenabled" } else { "&cdisabled" };
                ctx.reply(&format!("Announce chat {}", state));
                Ok(())
            })
            .command("Announce", CommandFlags::OP, "Sends an announcement to everyone", |ctx| {
                let Some(text) = ctx.args else {
                    return Err(CommandFailure);
                };
                ctx.server.broadcast(MessageType::Announcement, text);
                ctx.reply("Announcement sent.");
                Ok(())
            })
            .command("SelfDestroy", CommandFlags::NONE, "Unregisters itself", |ctx| {
                let name = ctx.command.to_owned();
                ctx.server.commands_mut().unregister(&name);
                ctx.reply("This command can no longer be called");
                Ok(())
            })
            .command("ClientOnly", CommandFlags::CLIENT, "Can only be called by players", |ctx| {
                ctx.reply(&format!("Client-only command called by {}", ctx.caller_name()));
                Ok(())
            })
    }
}

impl Plugin for TestPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("testplugin", semver::Version::new(1, 0, 0))
            .with_description("Custom blocks, announce chat and a handful of test commands")
    }

    fn load(&mut self, server: &mut Server) -> Result<()> {
        let blocks = PluginBlocks::install(server)?;
        self.blocks = Some(blocks);

        self.events = Some(server.events_mut().register_bunch(self.events(blocks)));
        self.commands = Some(server.commands_mut().register_bunch(self.commands())?);

        // Worlds loaded before the plugin never fire WorldAdded for it
        for world in server.world_ids() {
            blocks.define_in(server, world);
        }
        blocks.sync(server)?;

        tracing::info!("Test plugin loaded");
        Ok(())
    }

    fn unload(&mut self, server: &mut Server, force: bool) -> bool {
        if let Some(events) = self.events.take() {
            server.events_mut().unregister_bunch(events);
        }
        if let Some(commands) = self.commands.take() {
            server.commands_mut().unregister_bunch(commands);
        }

        if let Some(blocks) = self.blocks.take() {
            for (_, handle) in blocks.placements() {
                if server.undefine_global(handle).is_err() {
                    continue;
                }
                if let Ok(report) = server.update_definition(handle) {
                    tracing::debug!("Retracted {}: {} removals, {:?}", handle, report.removed, report.reclaimed);
                }
            }
        }

        tracing::info!("Test plugin unloaded (force: {})", force);
        true
    }
}
