use thiserror::Error;

/// Errors the projection engine can raise while processing a consensus
/// change.
///
/// The variant distinguishes transient from fatal conditions at the type
/// level (rather than leaving callers to pattern-match on a message), since
/// the two demand opposite responses: retry the same change, or abort the
/// process.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The datastore was unreachable or timed out. The consensus driver is
    /// expected to re-deliver the same change.
    #[error("datastore I/O error: {0}")]
    Transient(#[source] anyhow::Error),

    /// Stored JSON failed to decode. The projection is corrupt.
    #[error("codec error: {0}")]
    Codec(#[source] anyhow::Error),

    /// The projection disagrees with the consensus stream (negative
    /// balance, missing `ucos` entry for a spent input, an unlockable
    /// condition that is neither an address nor a multisig wallet, ...).
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The resume point handed to `subscribe` was not valid.
    #[error("subscription setup error: {0}")]
    SubscriptionSetup(#[source] anyhow::Error),
}

impl ProjectionError {
    /// Whether the caller should treat this as fatal (abort the process) as
    /// opposed to retryable (re-deliver the same change).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Transient(_))
    }
}
