//! Exit codes for the `dossier` CLI.
//!
//! Exit code ranges:
//! - 0-9: operational outcomes (parse the outcome from the code, not output)
//! - 10-19: user/input errors (recoverable by user action)
//! - 20-29: internal and environment errors

/// Stable process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational outcomes (0-9)
    // ========================================================================
    /// Everything requested succeeded.
    Clean = 0,

    /// Batch finished with at least one failed item.
    PartialFail = 3,

    // ========================================================================
    // User / input errors (10-19)
    // ========================================================================
    /// Invalid arguments.
    ArgsError = 10,

    /// The document failed validation.
    ValidationError = 11,

    /// No report with the requested id.
    NotFound = 12,

    /// Configuration could not be loaded or is invalid.
    ConfigError = 13,

    // ========================================================================
    // Internal / environment errors (20-29)
    // ========================================================================
    /// Internal error (bug).
    InternalError = 20,

    /// Reading inputs or writing outputs failed.
    IoError = 21,

    /// The report store failed.
    StoreError = 22,

    /// Rendering or PDF generation failed.
    RenderError = 23,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes below 10 describe outcomes, not errors.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK",
            ExitCode::PartialFail => "ERR_PARTIAL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ValidationError => "ERR_VALIDATION",
            ExitCode::NotFound => "ERR_NOT_FOUND",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::StoreError => "ERR_STORE",
            ExitCode::RenderError => "ERR_RENDER",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::PartialFail.is_operational());
        assert!(!ExitCode::PartialFail.is_success());
        assert!(ExitCode::ValidationError.is_user_error());
        assert!(ExitCode::StoreError.is_internal_error());
        assert_eq!(ExitCode::NotFound.to_string(), "ERR_NOT_FOUND (12)");
    }
}
