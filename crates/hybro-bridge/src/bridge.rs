//! The bridge handle and its attach/detach lifecycle.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hybro_protocol::{Command, CommandType};
use tokio::sync::watch;

use crate::channel::{Channel, MessageListener};
use crate::config::BridgeConfig;
use crate::package::PackageTree;
use crate::registry::ListenerRegistry;
use crate::transport::{LinkState, ResultTransport};

pub(crate) struct BridgeInner {
    pub(crate) packages: PackageTree,
    pub(crate) config: BridgeConfig,
    pub(crate) registry: Mutex<ListenerRegistry>,
    pub(crate) transport: ResultTransport,
    pub(crate) in_flight: watch::Sender<usize>,
    router: Mutex<Option<MessageListener>>,
}

impl BridgeInner {
    pub(crate) fn registry(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn router(&self) -> MutexGuard<'_, Option<MessageListener>> {
        self.router.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Host side of the guest-view RPC bridge.
///
/// Cheap to clone; clones share the listener registry and channel link.
/// Incoming messages are expected one at a time, in arrival order, which is
/// what every [`crate::MessageChannel`] implementation guarantees.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) inner: Arc<BridgeInner>,
}

impl Bridge {
    pub fn new(packages: PackageTree, config: BridgeConfig) -> Self {
        let transport = ResultTransport::new(config.chunk_size);
        Self {
            inner: Arc::new(BridgeInner {
                packages,
                config,
                registry: Mutex::new(ListenerRegistry::new()),
                transport,
                in_flight: watch::channel(0).0,
                router: Mutex::new(None),
            }),
        }
    }

    /// Bridge with default configuration.
    pub fn with_packages(packages: PackageTree) -> Self {
        Self::new(packages, BridgeConfig::default())
    }

    /// Start routing messages from `channel`.
    ///
    /// Without a live message sub-channel the bridge logs a warning and stays
    /// inert. Attaching while attached detaches the previous channel first.
    pub fn attach(&self, channel: Arc<dyn Channel>) {
        if self.is_attached() {
            tracing::warn!("bridge already attached, detaching previous channel");
            self.detach();
        }

        self.inner.transport.attach(Arc::clone(&channel));

        let Some(messages) = channel.message_channel() else {
            tracing::warn!("no message channel on attach, bridge is inert");
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        let listener = MessageListener::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                Bridge { inner }.handle_message(message);
            }
        });

        messages.add_listener(&self.inner.config.message_category, listener.clone());
        *self.inner.router() = Some(listener);
        tracing::info!(
            category = %self.inner.config.message_category,
            "bridge attached"
        );
    }

    /// Stop routing messages and unsubscribe every live listener.
    ///
    /// Each listener command still active gets exactly one synthesized
    /// `REMOVE_EVENT_LISTENER`, whose result is still sent on the channel.
    /// In-flight invocations are not cancelled.
    pub fn detach(&self) {
        let router = self.inner.router().take();
        let messages = self
            .inner
            .transport
            .channel()
            .and_then(|channel| channel.message_channel());

        match (messages, router) {
            (Some(messages), Some(router)) => {
                messages.remove_listener(&self.inner.config.message_category, &router);
            }
            _ => tracing::warn!("no message channel on detach"),
        }

        let removed = self.remove_all_listeners();

        if let LinkState::Attached(_) = self.inner.transport.detach() {
            tracing::info!(removed, "bridge detached");
        }
    }

    /// Synthesize a removal for every listener still active. Returns how
    /// many removals were driven.
    fn remove_all_listeners(&self) -> usize {
        let active = self.inner.registry().active_commands();
        let mut removed = 0usize;

        for command in &active {
            self.remove_listener(&command.with_kind(CommandType::RemoveEventListener));
            removed += 1;
        }

        // A REMOVE carrying another command's id prunes the active list but
        // leaves that command's callback subscribed; unsubscribe those too.
        let orphans = self.inner.registry().registered_commands();
        for command in &orphans {
            tracing::debug!(command_id = %command.id, "removing orphaned listener");
            self.remove_listener(&command.with_kind(CommandType::RemoveEventListener));
            removed += 1;
        }

        removed
    }

    pub fn is_attached(&self) -> bool {
        self.inner.transport.is_attached()
    }

    /// Commands behind the listeners currently active, oldest first.
    pub fn active_listener_commands(&self) -> Vec<Command> {
        self.inner.registry().active_commands()
    }

    /// Number of host callbacks currently subscribed to event sources.
    pub fn listener_count(&self) -> usize {
        self.inner.registry().len()
    }

    /// Invocations spawned but not yet answered.
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.borrow()
    }

    /// Wait until no invocation is in flight.
    pub async fn wait_idle(&self) {
        let mut count = self.inner.in_flight.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = count.wait_for(|pending| *pending == 0).await;
    }

    pub fn packages(&self) -> &PackageTree {
        &self.inner.packages
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("packages", &self.inner.packages)
            .field("attached", &self.is_attached())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
