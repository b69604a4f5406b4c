//! Structured error handling and exit codes.

use serde::Serialize;

use crate::indexer::IndexError;
use crate::report::ReportError;
use crate::store::StoreError;

/// Exit codes for the findex binary.
///
/// - 0: Success
/// - 1: General error (including usage errors and lock conflicts)
/// - 2: `duplicates` found no duplicate groups
/// - 3: Partial success (index committed, some files skipped)
/// - 130: Interrupted by user (Ctrl+C), nothing committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed normally.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: the index holds no duplicate groups.
    NoDuplicates = 2,
    /// Partial success: the scan committed but skipped some files.
    PartialSuccess = 3,
    /// Interrupted: Scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FX000",
            Self::GeneralError => "FX001",
            Self::NoDuplicates => "FX002",
            Self::PartialSuccess => "FX003",
            Self::Interrupted => "FX130",
        }
    }

    /// Exit code for a fatal error returned by `run_app`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<IndexError>() {
            Some(IndexError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Short machine-readable classification of a fatal error.
fn error_kind(err: &anyhow::Error) -> &'static str {
    let store_kind = |e: &StoreError| match e {
        StoreError::LockConflict(_) => "lock_conflict",
        StoreError::AlgorithmMismatch { .. } => "algorithm_mismatch",
        StoreError::Schema(_) => "schema",
        StoreError::Open { .. } => "open",
        StoreError::UnhashedRecord(_) | StoreError::Database(_) => "database",
    };

    if let Some(e) = err.downcast_ref::<IndexError>() {
        return match e {
            IndexError::Root(_) => "root_not_found",
            IndexError::StaleGeneration { .. } => "stale_generation",
            IndexError::Store(e) => store_kind(e),
            IndexError::Interrupted => "interrupted",
        };
    }
    if let Some(e) = err.downcast_ref::<StoreError>() {
        return store_kind(e);
    }
    if let Some(ReportError::Store(e)) = err.downcast_ref::<ReportError>() {
        return store_kind(e);
    }
    "general"
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FX001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Error classification (e.g., "lock_conflict")
    pub kind: &'static str,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            kind: error_kind(err),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
