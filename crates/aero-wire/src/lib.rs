//! Cross-process command wire for a GPU device.
//!
//! A [`Client`] in an untrusted process encodes graphics API calls into a
//! compact byte stream; a [`Server`] in the process that owns the device
//! decodes that stream, resolves object handles, and drives a [`NativeApi`]
//! backend. Results of asynchronous work (adapter and device requests, buffer
//! mapping, pipeline creation, error scopes) flow back as return commands and resume the continuation the
//! client registered for them.
//!
//! The server treats every input byte as hostile: each command is bounds
//! checked, every handle is validated against its type and generation, and
//! decode allocations are budgeted. The first violation tears the channel
//! down instead of skipping ahead.
//!
//! Transport is left to the embedder. Both endpoints accept arbitrarily split
//! chunks; [`ring::ChunkRing`] is a ready-made in-process transport.

pub mod buffer;
pub mod callbacks;
pub mod chunked;
pub mod client;
pub mod config;
mod error;
pub mod handle;
pub mod ring;
pub mod schema;
pub mod server;
pub mod types;

/// Recording backend and loopback harness for tests.
///
/// Only available for this crate's own tests or with the `test-utils`
/// feature. Not part of the stable API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use crate::client::{CancelReason, Client, DeviceEvent, Outcome, Reply, RequestScope};
pub use crate::config::WireConfig;
pub use crate::error::{WireError, WireResult};
pub use crate::handle::{Handle, ObjectType};
pub use crate::schema::{CommandKind, ForwardCommand, ReturnCommand, ReturnKind, Value};
pub use crate::server::{NativeApi, Server};
