/// Errors surfaced by the remote transaction / cursor layer (spec §4.3) and
/// the state-changes stream (spec §4.5).
///
/// A `Transport` error means the underlying gRPC stream is no longer usable;
/// per spec §4.3 the caller must not reuse the transaction after observing
/// one.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The bidirectional stream, a unary call, or the state-changes stream
    /// failed at the transport level (connection reset, status error, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The process is shutting down and in-flight RPCs were cancelled via
    /// completion-queue shutdown (spec §4.2).
    #[error("cancelled")]
    Cancelled,

    /// A cursor operation referenced a cursor id the transaction does not
    /// own, or that was already closed.
    #[error("cursor not found: {0}")]
    CursorNotFound(u32),

    /// `cursor(table)` / `cursor_dup_sort(table)` was called with a table
    /// name the remote KV service does not recognize.
    #[error("unknown table: {0}")]
    TableUnknown(String),

    /// A second operation was issued on a transaction before the first one
    /// completed, violating the per-transaction serialization rule (spec
    /// §4.3, §5).
    #[error("transaction operations must be serialized")]
    NotSerialized,

    /// The transaction was used after `close()` was called.
    #[error("transaction already closed")]
    AlreadyClosed,
}

impl DbError {
    /// `true` for errors that mean the transaction must be treated as dead
    /// and closed by the caller regardless of how the failure surfaced.
    pub fn is_fatal_to_transaction(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Cancelled)
    }
}

impl From<tonic::Status> for DbError {
    fn from(status: tonic::Status) -> Self {
        if status.code() == tonic::Code::Cancelled {
            Self::Cancelled
        } else {
            Self::Transport(status.message().to_owned())
        }
    }
}
