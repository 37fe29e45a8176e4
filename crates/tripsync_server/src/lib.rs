//! # Tripsync Server
//!
//! Reference remote record store for tripsync.
//!
//! This crate provides:
//! - A record store keyed by identity with LWW `merge` and `changes_since`
//! - Push and paged pull handlers
//! - Path-based dispatch of CBOR request bodies (`/sync/push`, `/sync/pull`)
//! - With the `loopback` feature, an in-process endpoint for the engine's
//!   `LoopbackClient`
//!
//! # Architecture
//!
//! The store holds one current envelope per `(kind, id)`. Every mutation
//! goes through a single mutex, so merges are serialized and reads see a
//! consistent snapshot. Pushes are idempotent: re-sending an envelope the
//! store already holds changes nothing.
//!
//! Pull pages are keyed on `(updated_at, kind, id)`; records sharing a
//! timestamp are never split across a page boundary and lost.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
#[cfg(feature = "loopback")]
mod loopback;
mod server;
mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use server::SyncServer;
pub use store::RecordStore;
