//! Content store capability for cidgate.
//!
//! cidgate never stores content itself. It drives an external
//! content-addressable store that offers blob ingestion plus a mutable
//! hierarchical namespace (the "files" API of an IPFS node) layered on top.
//! This crate narrows that store down to the handful of calls the gatekeeper
//! needs.
//!
//! # Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`KuboClient`] -- HTTP RPC client for a Kubo-compatible daemon
//! - [`InMemoryContentStore`] -- in-process fake for tests and local runs
//!
//! # Rules
//!
//! 1. `ingest` never pins; retention is expressed only by namespace links.
//! 2. A missing path is always reported as [`StoreError::NotFound`], so
//!    callers can turn it into a boolean without string matching.
//! 3. Every other failure is propagated unchanged.

pub mod error;
pub mod kubo;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use kubo::{KuboClient, KuboConfig};
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
pub use types::{DirEntry, Stat};
