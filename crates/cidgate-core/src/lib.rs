//! Serialized namespace operations for cidgate.
//!
//! The gatekeeper keeps one directory in an external content store (the
//! namespace root) whose identifier changes every time an entry is linked
//! or unlinked. This crate owns the only logic with invariants to protect:
//! every read or write of that root runs as one exclusive step through a
//! [`RootSerializer`], so concurrent requests never race on the root,
//! never link the same content twice, and never report a stale root.
//!
//! # Operations
//!
//! [`ContentService`] exposes four operations, all admitted through the
//! same gate:
//!
//! - `add` -- ingest bytes and link them at `<root>/<cid>`, or report a
//!   conflict if that entry already exists
//! - `remove` -- unlink `<root>/<cid>`, or report that it is absent
//! - `list` -- the root identifier plus every retained entry, skipping
//!   transient `tmp_` entries
//! - `health` -- an empty critical section
//!
//! # Ingest before check
//!
//! `add` ingests content before checking for a duplicate entry. Content
//! that turns out to be a duplicate is left in the store unlinked and is
//! not released; the store may also collect freshly ingested content
//! before the link step runs, in which case the link fails and is reported
//! as indeterminate.

pub mod error;
pub mod outcome;
pub mod serializer;
pub mod service;

pub use error::{CoreError, CoreResult};
pub use outcome::{AddOutcome, Listing, RemoveOutcome};
pub use serializer::RootSerializer;
pub use service::ContentService;
