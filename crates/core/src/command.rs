//! Command table, command bunches and the context handed to handlers

use crate::client::ClientId;
use crate::error::CommandError;
use crate::server::Server;
use proto::MessageType;
use std::collections::HashMap;
use std::sync::Arc;

/// Who may call a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandFlags(u8);

impl CommandFlags {
    /// Anyone, including the console
    pub const NONE: Self = Self(0);
    /// Operators and the console
    pub const OP: Self = Self(1);
    /// Connected clients only, never the console
    pub const CLIENT: Self = Self(1 << 1);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for CommandFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Generic failure reported by a command handler. The dispatcher answers it
/// with the configured failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("command failed")]
pub struct CommandFailure;

/// Everything a handler gets to see about one invocation
pub struct CommandContext<'a> {
    pub server: &'a mut Server,
    /// `None` when called from the console
    pub caller: Option<ClientId>,
    /// Argument text after the command name, trimmed; `None` when empty
    pub args: Option<&'a str>,
    /// Name the command was registered under
    pub command: &'a str,
}

impl CommandContext<'_> {
    /// Answer the caller in their normal chat area, or in the log for the console.
    pub fn reply(&self, text: &str) {
        reply_to(self.server, self.caller, text);
    }

    pub fn caller_name(&self) -> String {
        match self.caller.and_then(|id| self.server.client(id)) {
            Some(client) => client.name().to_owned(),
            None => self.server.config().commands.console_name.clone(),
        }
    }
}

pub(crate) fn reply_to(server: &Server, caller: Option<ClientId>, text: &str) {
    match caller {
        Some(id) => {
            if !server.send_message(id, MessageType::Chat, text) {
                tracing::debug!("Dropped reply to {}: {}", id, text);
            }
        }
        None => tracing::info!("[{}] {}", server.config().commands.console_name, text),
    }
}

/// Command handler signature
pub type CommandFn = dyn Fn(&mut CommandContext<'_>) -> Result<(), CommandFailure> + Send + Sync;

/// A registered command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub flags: CommandFlags,
    pub description: String,
    pub handler: Arc<CommandFn>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Ordered group of commands registered and unregistered together
#[derive(Default)]
pub struct CommandBunch {
    commands: Vec<Command>,
}

impl CommandBunch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command<F>(mut self, name: &str, flags: CommandFlags, description: &str, handler: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandFailure> + Send + Sync + 'static,
    {
        self.commands.push(Command {
            name: name.to_owned(),
            flags,
            description: description.to_owned(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Proof that a command bunch is registered, consumed on teardown.
#[derive(Debug)]
#[must_use = "a command bunch stays registered until its handle is passed to unregister_bunch"]
pub struct CommandBunchHandle {
    registration: u64,
    names: Vec<String>,
}

impl CommandBunchHandle {
    /// Lowercased names of the commands in this registration
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

struct Entry {
    command: Command,
    registration: u64,
}

/// Case-insensitive command lookup table
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, Entry>,
    next_registration: u64,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(name: &str) -> Result<String, CommandError> {
        if name.is_empty() || name.starts_with('/') || name.chars().any(char::is_whitespace) {
            return Err(CommandError::InvalidName(name.to_owned()));
        }
        Ok(name.to_ascii_lowercase())
    }

    /// Register every command of `bunch`, or none of them.
    ///
    /// A name colliding with the table or with an earlier entry of the same
    /// bunch rolls back what was already inserted.
    pub fn register_bunch(&mut self, bunch: CommandBunch) -> Result<CommandBunchHandle, CommandError> {
        let registration = self.next_registration;
        self.next_registration += 1;

        let mut names: Vec<String> = Vec::with_capacity(bunch.commands.len());
        for command in bunch.commands {
            let key = match Self::validate(&command.name) {
                Ok(key) if !self.commands.contains_key(&key) => key,
                Ok(_) => {
                    self.rollback(&names);
                    tracing::warn!("Command '{}' is already registered", command.name);
                    return Err(CommandError::Collision(command.name));
                }
                Err(e) => {
                    self.rollback(&names);
                    tracing::warn!("{}", e);
                    return Err(e);
                }
            };

            self.commands.insert(key.clone(), Entry { command, registration });
            names.push(key);
        }

        tracing::debug!("Registered command bunch: {}", names.join(", "));
        Ok(CommandBunchHandle { registration, names })
    }

    fn rollback(&mut self, names: &[String]) {
        for name in names {
            self.commands.remove(name);
        }
    }

    /// Register a single command; the degenerate one-entry bunch
    pub fn register<F>(
        &mut self,
        name: &str,
        flags: CommandFlags,
        description: &str,
        handler: F,
    ) -> Result<CommandBunchHandle, CommandError>
    where
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandFailure> + Send + Sync + 'static,
    {
        self.register_bunch(CommandBunch::new().command(name, flags, description, handler))
    }

    /// Remove the commands of a registration that are still its own.
    ///
    /// Names already removed, or taken over by a later registration, are
    /// skipped. Returns how many commands were removed.
    pub fn unregister_bunch(&mut self, handle: CommandBunchHandle) -> usize {
        let mut removed = 0;

        for name in &handle.names {
            let owned = self
                .commands
                .get(name)
                .is_some_and(|entry| entry.registration == handle.registration);
            if owned {
                self.commands.remove(name);
                removed += 1;
            }
        }

        tracing::debug!("Unregistered command bunch, {} of {} commands removed", removed, handle.names.len());
        removed
    }

    /// Remove one command by name, whoever registered it.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.commands.remove(&name.to_ascii_lowercase()).is_some();
        if removed {
            tracing::debug!("Unregistered command '{}'", name);
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_ascii_lowercase()).map(|entry| &entry.command)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Result of running a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Executed,
    /// The handler reported failure
    Failed,
    /// The caller lacks the required permission
    Denied,
    Unknown,
}

/// Split `/name args` into the name and the trimmed argument text.
pub fn parse_line(line: &str) -> Option<(&str, Option<&str>)> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);

    let (name, args) = match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (line, ""),
    };

    if name.is_empty() {
        return None;
    }
    Some((name, (!args.is_empty()).then_some(args)))
}
