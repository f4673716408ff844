use cidgate_types::ContentId;

/// Result of statting a namespace path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stat {
    /// Identifier of the node currently at the path.
    pub cid: ContentId,
}

/// One direct child of a namespace directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub cid: ContentId,
}
