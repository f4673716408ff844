use cidgate_store::StoreError;
use cidgate_types::{ContentId, ParseError};
use thiserror::Error;

/// Errors from gatekeeper operations.
///
/// Duplicate adds and absent removes are not errors; they are reported as
/// [`AddOutcome::Conflict`](crate::AddOutcome::Conflict) and
/// [`RemoveOutcome::NotFound`](crate::RemoveOutcome::NotFound).
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller supplied identifier text that is not a CID.
    #[error(transparent)]
    InvalidIdentifier(#[from] ParseError),

    /// A store call failed. Nothing was linked or unlinked by this
    /// operation unless the failing call was the final root stat.
    #[error(transparent)]
    OperationFailed(#[from] StoreError),

    /// The link step failed; the entry may or may not exist now.
    #[error("linking {cid} at {path} failed, namespace state is indeterminate: {source}")]
    LinkIndeterminate {
        cid: ContentId,
        path: String,
        #[source]
        source: StoreError,
    },
}

impl CoreError {
    /// Returns `true` if the failure is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidIdentifier(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
