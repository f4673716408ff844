//! Mapping between content identifiers and namespace entry paths.

use crate::content_id::ContentId;

/// Name prefix reserved for store-internal, in-progress entries.
pub const TRANSIENT_PREFIX: &str = "tmp_";

/// Path of the entry that retains `cid` under `root`: `<root>/<cid>`.
pub fn path_for(root: &str, cid: &ContentId) -> String {
    format!("{root}/{cid}")
}

/// Returns `true` if an entry name is reserved for transient store state.
pub fn is_transient(name: &str) -> bool {
    name.starts_with(TRANSIENT_PREFIX)
}
