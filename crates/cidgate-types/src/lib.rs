//! Foundation types for cidgate.
//!
//! Every other cidgate crate depends on `cidgate-types` for the content
//! identifier and the rules that map identifiers onto namespace paths.
//!
//! # Key Types
//!
//! - [`ContentId`] -- Parsed, canonical content identifier (CID)
//! - [`ParseError`] -- Rejected identifier text together with the decode failure
//! - [`path_for`] -- Deterministic `<root>/<cid>` entry path
//! - [`is_transient`] -- Reserved `tmp_` entry names that listing must skip

pub mod content_id;
pub mod error;
pub mod path;

pub use content_id::{codec, ContentId};
pub use error::ParseError;
pub use path::{is_transient, path_for, TRANSIENT_PREFIX};
