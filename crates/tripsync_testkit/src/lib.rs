//! # Tripsync Testkit
//!
//! Test utilities for tripsync.
//!
//! This crate provides:
//! - Envelope fixtures and builders
//! - Property-based test generators using proptest
//! - A multi-device harness wired to an in-process server
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tripsync_testkit::prelude::*;
//!
//! #[test]
//! fn devices_converge() {
//!     let mut cluster = Cluster::new(3);
//!     cluster.device(0).put(RecordKind::Trip, fixed_id(1), b"x".to_vec());
//!     cluster.converge().unwrap();
//!     assert!(cluster.is_converged());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
    pub use tripsync_protocol::{RecordEnvelope, RecordKind, SyncBatch, Timestamp};
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
