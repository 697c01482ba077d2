//! Bookkeeping for live event subscriptions.

use std::collections::HashMap;
use std::fmt;

use hybro_protocol::{Command, CommandId, ListenerArgs};

use crate::event::EventHandler;

/// Composite key of one subscription: package, module, event and the id of
/// the command that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub package: String,
    pub module: String,
    pub event: String,
    pub command_id: String,
}

impl ListenerKey {
    pub fn new(args: &ListenerArgs, command_id: &CommandId) -> Self {
        Self {
            package: args.package.clone(),
            module: args.module.clone(),
            event: args.event.clone(),
            command_id: command_id.key(),
        }
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.package, self.module, self.event, self.command_id
        )
    }
}

#[derive(Debug, Clone)]
struct Registration {
    seq: u64,
    handler: EventHandler,
    command: Command,
}

#[derive(Debug, Clone)]
struct ActiveCommand {
    target: ListenerArgs,
    command: Command,
}

/// Callbacks by key, plus the ordered list of commands that created live
/// listeners.
///
/// The two collections are kept separately: the command list is pruned by
/// target (package, module, event) regardless of command id, while callbacks
/// are removed by exact key.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    handlers: HashMap<ListenerKey, Registration>,
    active: Vec<ActiveCommand>,
    next_seq: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &ListenerKey) -> bool {
        self.handlers.contains_key(key)
    }

    /// Record a successful subscription.
    pub fn insert(
        &mut self,
        key: ListenerKey,
        target: ListenerArgs,
        handler: EventHandler,
        command: Command,
    ) {
        self.active.push(ActiveCommand {
            target,
            command: command.clone(),
        });
        let seq = self.next_seq;
        self.next_seq += 1;
        self.handlers.insert(
            key,
            Registration {
                seq,
                handler,
                command,
            },
        );
    }

    /// Take the callback stored under `key`, if any.
    pub fn take_handler(&mut self, key: &ListenerKey) -> Option<EventHandler> {
        self.handlers
            .remove(key)
            .map(|registration| registration.handler)
    }

    /// Drop every active command subscribed to `target`. Returns how many were dropped.
    pub fn forget_target(&mut self, target: &ListenerArgs) -> usize {
        let before = self.active.len();
        self.active.retain(|active| &active.target != target);
        before - self.active.len()
    }

    /// Snapshot of the commands behind live listeners, oldest first.
    pub fn active_commands(&self) -> Vec<Command> {
        self.active
            .iter()
            .map(|active| active.command.clone())
            .collect()
    }

    /// Commands whose callbacks are still stored, oldest first. Used after
    /// the active list has been torn down to catch subscriptions it no longer
    /// tracks.
    pub fn registered_commands(&self) -> Vec<Command> {
        let mut registrations: Vec<&Registration> = self.handlers.values().collect();
        registrations.sort_by_key(|registration| registration.seq);
        registrations
            .into_iter()
            .map(|registration| registration.command.clone())
            .collect()
    }

    /// Number of stored callbacks.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
