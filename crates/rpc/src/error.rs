//! Conversion between this crate's [`JsonRpcError`] and the wire
//! `ErrorObjectOwned` jsonrpsee expects every handler to fail with, plus the
//! exception boundary itself (spec.md §4.11, §7: "catch every exception
//! type at the handler boundary; never let one escape into the reactor
//! loop").

use jsonrpsee::types::ErrorObjectOwned;
use rpcdaemon_errors::JsonRpcError;

/// `JsonRpcError { code, message }` -> jsonrpsee's owned error object.
pub fn to_error_object(err: JsonRpcError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(err.code as i32, err.message, None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcdaemon_errors::RpcErrorCode;

    #[test]
    fn carries_code_and_message_through() {
        let err = JsonRpcError::new(RpcErrorCode::DomainError, "transaction not found: 0x1");
        let obj = to_error_object(err);
        assert_eq!(obj.code(), -32000);
        assert_eq!(obj.message(), "transaction not found: 0x1");
    }
}
