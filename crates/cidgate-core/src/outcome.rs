use cidgate_types::ContentId;

/// Result of a completed `add`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The content was linked; the root now has identifier `new_root_cid`.
    Created {
        cid: ContentId,
        new_root_cid: ContentId,
    },
    /// An entry for this content already existed; nothing was linked.
    Conflict { cid: ContentId },
}

impl AddOutcome {
    /// Identifier of the submitted content.
    pub fn cid(&self) -> &ContentId {
        match self {
            Self::Created { cid, .. } | Self::Conflict { cid } => cid,
        }
    }

    /// The root identifier after the add, if the root changed.
    pub fn new_root_cid(&self) -> Option<&ContentId> {
        match self {
            Self::Created { new_root_cid, .. } => Some(new_root_cid),
            Self::Conflict { .. } => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Result of a completed `remove`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The entry was unlinked; the root now has identifier `new_root_cid`.
    Removed {
        cid: ContentId,
        new_root_cid: ContentId,
    },
    /// No entry existed for this content.
    NotFound { cid: ContentId },
}

impl RemoveOutcome {
    pub fn cid(&self) -> &ContentId {
        match self {
            Self::Removed { cid, .. } | Self::NotFound { cid } => cid,
        }
    }

    pub fn new_root_cid(&self) -> Option<&ContentId> {
        match self {
            Self::Removed { new_root_cid, .. } => Some(new_root_cid),
            Self::NotFound { .. } => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// Snapshot of retained content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    pub root_cid: ContentId,
    /// Retained identifiers in the store's enumeration order, which is not
    /// stable across calls.
    pub cids: Vec<ContentId>,
}

impl Listing {
    pub fn contains(&self, cid: &ContentId) -> bool {
        self.cids.contains(cid)
    }
}
