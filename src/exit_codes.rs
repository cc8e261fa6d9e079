//! Exit code standardization for costdash
//!
//! ## Exit Code Convention
//!
//! - `0` = Success
//! - `1` = User error (invalid input, invalid date range, object not found)
//! - `2` = System error (AWS API failure, network error, unreadable response)
//! - `3` = Configuration error (config parse error, invalid config value)
//! - `4` = Credential or permission error (do not retry automatically)

use crate::error::CostdashError;

/// Standard exit codes for costdash
pub mod codes {
    /// Success
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    /// User error (invalid input, validation failure)
    pub const USER_ERROR: i32 = 1;
    /// System error (AWS API failure, network error)
    pub const SYSTEM_ERROR: i32 = 2;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 3;
    /// Credentials missing/expired or access denied
    pub const AUTH_ERROR: i32 = 4;
}

/// Map a CostdashError to an exit code
pub fn exit_code_for_error(error: &CostdashError) -> i32 {
    use CostdashError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        Validation { .. } => codes::USER_ERROR,
        InvalidRange { .. } => codes::USER_ERROR,
        NotFound { .. } => codes::USER_ERROR,

        Auth { .. } => codes::AUTH_ERROR,
        Access { .. } => codes::AUTH_ERROR,

        Transient { .. } => codes::SYSTEM_ERROR,
        Aws { .. } => codes::SYSTEM_ERROR,
        Parse { .. } => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Exit code for an error that reached the CLI boundary as `anyhow::Error`.
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<CostdashError>()
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}
