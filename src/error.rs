use thiserror::Error;

/// Failure modes of one pipeline run.
///
/// Only `Connection` aborts a run. Every other variant is handled at message
/// or file granularity: the item is skipped, the failure is logged, and the
/// run still reports success with fewer files extracted.
#[derive(Debug, Error)]
pub enum Error {
    /// Mail server unreachable or login rejected. Fatal to the run.
    #[error("mailbox connection failed: {0}")]
    Connection(String),

    /// Server rejected the candidate query. Treated as an empty result.
    #[error("server search failed: {0}")]
    Search(String),

    /// A single message could not be fetched. That message is skipped.
    #[error("message fetch failed: {0}")]
    Fetch(String),

    /// Extension or size outside policy. That file is skipped.
    #[error("{0}")]
    Validation(String),

    /// Embedded-image retrieval failed. That URL is skipped.
    #[error("image retrieval failed: {0}")]
    Network(String),

    /// Local staging write failed. That file is skipped.
    #[error("staging write failed: {0}")]
    Write(#[from] std::io::Error),
}
