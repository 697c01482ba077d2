//! Wire contract for the hybro host/guest-view bridge.
//!
//! The guest view sends structured commands over a one-way message channel and
//! the host answers over the same channel. This crate owns everything both
//! sides must agree on:
//! - the command envelope (`{id, type, args}`) and its three type tags
//! - the result envelope (`{type, id, commandId, result, parts, index}`)
//! - chunk splitting for results larger than one channel message
//!
//! Field names and type tags are a compatibility surface. Do not rename them.

pub mod chunk;
pub mod codec;
pub mod command;
pub mod error;
pub mod result;
pub mod types;

pub use chunk::{part_count, split_chunks, CHUNK_SIZE};
pub use codec::{parse, stringify};
pub use command::{Command, CommandId, InvokeArgs, ListenerArgs, RawMessage};
pub use error::{ProtocolError, Result};
pub use result::{ErrorPayload, OutgoingResult};
pub use types::{CommandType, ResultType, MESSAGE_CATEGORY};
