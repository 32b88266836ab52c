use crate::{DbError, ProviderError};
use serde::Serialize;

/// JSON-RPC error codes used by this gateway (spec §6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum RpcErrorCode {
    /// Handler exception, parameter validation failure, transport failure,
    /// decode failure or cancellation.
    HandlerException = 100,
    /// Method recognized but intentionally unimplemented (spec §9 "open
    /// questions": several debug/trace methods return this rather than a
    /// guessed implementation).
    NotYetImplemented = 500,
    /// Domain error such as "transaction not found".
    DomainError = -32000,
    /// Method name not present in the dispatch table.
    MethodNotFound = -32601,
}

impl RpcErrorCode {
    /// The raw numeric code as carried in the JSON-RPC error envelope.
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// `{code, message}` pair placed into a JSON-RPC error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Numeric error code, see [`RpcErrorCode`].
    pub code: i64,
    /// Human-readable message; for transport/decode errors this includes
    /// the peer message or decode tag per spec §7.
    pub message: String,
}

impl JsonRpcError {
    /// Build an error with an explicit code, bypassing [`RpcErrorCode`] for
    /// call sites that already hold a raw code (e.g. replaying a
    /// `tonic::Status` code through unchanged).
    pub fn new(code: RpcErrorCode, message: impl Into<String>) -> Self {
        Self { code: code.code(), message: message.into() }
    }

    /// `code: -32601, message: "method not found"`.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(RpcErrorCode::MethodNotFound, format!("method not found: {method}"))
    }

    /// `code: 500, message: "not yet implemented"` (spec §7, §9).
    pub fn not_yet_implemented() -> Self {
        Self::new(RpcErrorCode::NotYetImplemented, "not yet implemented")
    }

    /// Catch-all for a panic caught at the handler boundary (spec §4.11):
    /// `code: 100, message: "unexpected exception"`.
    pub fn unexpected_exception() -> Self {
        Self::new(RpcErrorCode::HandlerException, "unexpected exception")
    }

    /// `code: 100, message: "cancelled"` (spec §7 cancellation row).
    pub fn cancelled() -> Self {
        Self::new(RpcErrorCode::HandlerException, "cancelled")
    }
}

impl From<DbError> for JsonRpcError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Cancelled => Self::cancelled(),
            other => Self::new(RpcErrorCode::HandlerException, other.to_string()),
        }
    }
}

impl From<ProviderError> for JsonRpcError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Db(db) => db.into(),
            ProviderError::BlockNotFound(_) | ProviderError::TransactionNotFound(_) => {
                Self::new(RpcErrorCode::DomainError, err.to_string())
            }
            ProviderError::Decode { .. } | ProviderError::EmptyValue(_) | ProviderError::ViewNotReady => {
                Self::new(RpcErrorCode::HandlerException, err.to_string())
            }
        }
    }
}
