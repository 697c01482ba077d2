//! Host-side RPC bridge for embedded guest views.
//!
//! Guest script running in an embedded view calls methods and subscribes to
//! events on a tree of host packages; results travel back as chunked JSON
//! messages over the view's message channel.
//!
//! # Crate Structure
//!
//! - [`protocol`]: wire types, command decoding and result chunking
//! - [`bridge`]: package tree, listener registry, attach/detach lifecycle

/// Re-export protocol types.
pub mod protocol {
    pub use hybro_protocol::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use hybro_bridge::*;
}
