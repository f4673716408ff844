use thiserror::Error;

/// Identifier text that could not be decoded into a [`ContentId`].
///
/// [`ContentId`]: crate::ContentId
#[derive(Debug, Error)]
#[error("'{input}' is not a CID: {source}")]
pub struct ParseError {
    input: String,
    #[source]
    source: cid::Error,
}

impl ParseError {
    pub(crate) fn new(input: impl Into<String>, source: cid::Error) -> Self {
        Self {
            input: input.into(),
            source,
        }
    }

    /// The offending input, verbatim.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The underlying decode failure.
    pub fn cause(&self) -> &cid::Error {
        &self.source
    }
}
