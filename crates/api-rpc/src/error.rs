//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use tierd_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const SHUTTING_DOWN: i32 = 4004;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::ShuttingDown(msg) => {
            ErrorObjectOwned::owned(code::SHUTTING_DOWN, msg, None::<()>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierd_core::domain::DomainError;

    #[test]
    fn test_unknown_tier_maps_to_validation_code() {
        let err = to_rpc_error(AppError::Domain(DomainError::UnknownTier("x".into())));
        assert_eq!(err.code(), code::VALIDATION_ERROR);
        assert!(err.message().contains("Unknown tier"));
    }

    #[test]
    fn test_shutdown_maps_to_its_own_code() {
        let err = to_rpc_error(AppError::ShuttingDown("bye".into()));
        assert_eq!(err.code(), code::SHUTTING_DOWN);
        assert_eq!(err.message(), "bye");
    }
}
