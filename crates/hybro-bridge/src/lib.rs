//! Host side of a bidirectional RPC bridge with an embedded guest view.
//!
//! The host exposes a tree of packages → modules → methods and events. Guest
//! script sends `INVOKE`, `ADD_EVENT_LISTENER` and `REMOVE_EVENT_LISTENER`
//! commands over a message channel; the bridge resolves them against the
//! [`PackageTree`], tracks live subscriptions, and answers with chunked
//! results over the same channel.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hybro_bridge::{Bridge, FnModule, MemoryChannel, Package, PackageTree};
//! use serde_json::{json, Value};
//!
//! # async fn run() {
//! let packages = PackageTree::new().package(
//!     "math",
//!     Package::new().module(
//!         "calc",
//!         FnModule::new().method("add", |params: Vec<Value>| {
//!             let sum: i64 = params.iter().filter_map(Value::as_i64).sum();
//!             Ok(json!(sum))
//!         }),
//!     ),
//! );
//!
//! let channel = MemoryChannel::new();
//! let bridge = Bridge::with_packages(packages);
//! bridge.attach(Arc::new(channel.clone()));
//! # }
//! ```

pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;
mod invoke;
mod listeners;
pub mod memory;
pub mod module;
pub mod package;
pub mod registry;
mod router;
pub mod transport;

pub use bridge::Bridge;
pub use channel::{Channel, MessageChannel, MessageListener};
pub use config::BridgeConfig;
pub use error::{BridgeError, ChannelError, MethodError, Result};
pub use event::{EventEmitter, EventHandler, HandlerId};
pub use memory::MemoryChannel;
pub use module::FnModule;
pub use package::{MethodFuture, Module, ModuleDescriptor, ModuleInfo, Package, PackageTree};
pub use registry::{ListenerKey, ListenerRegistry};
pub use transport::{LinkState, ResultTransport};
