//! Wire types for the local client API.
//!
//! This crate holds the serde-serializable shapes exchanged over the
//! WebSocket pub/sub channel: a restricted subset of WAMP where every message
//! is a JSON array led by an integer opcode.
//!
//! Types in this crate are:
//! - **Pure data**: no I/O, no task spawning
//! - **1:1 with the wire**: `[5, topic]`, `[6, topic]`, `[8, channel, event]`
//! - **Forward compatible**: unknown event types and payload shapes are kept
//!   as opaque values instead of being rejected
//!
//! Routing, filtering, and connection management live in `lcu-runtime`.

pub mod event;
pub mod wire;

pub use event::*;
pub use wire::*;
