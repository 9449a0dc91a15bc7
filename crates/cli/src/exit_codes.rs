//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 1       | Universal  | General error (unspecified)                  |
//! | 2       | Universal  | CLI usage error (bad args, bad config)       |
//! | 3-9     | run        | Consolidation run outcomes                   |
//! | 50-59   | fetch      | Series API                                   |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, invalid config.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run (3-9)
// =============================================================================

/// At least one identifier was not found or failed. The store was still
/// saved with every series that succeeded.
pub const EXIT_RUN_UNRESOLVED: u8 = 3;

/// An input workbook (manifest, source, store) could not be loaded.
/// Nothing was written.
pub const EXIT_RUN_LOAD: u8 = 4;

/// The store or the annotated manifest could not be written.
pub const EXIT_RUN_PERSIST: u8 = 5;

/// The run was interrupted (SIGINT). Series merged before the interrupt
/// were saved.
pub const EXIT_RUN_INTERRUPTED: u8 = 6;

// =============================================================================
// Fetch (50-59) — series API
// =============================================================================

/// Network failure or upstream error (5xx, timeout).
pub const EXIT_FETCH_UPSTREAM: u8 = 50;

/// Series not found upstream (404, or an empty first page).
pub const EXIT_FETCH_NOT_FOUND: u8 = 51;

/// Request rejected upstream (other 4xx, usually a malformed series ID).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Response body was not the expected CSV.
pub const EXIT_FETCH_PAYLOAD: u8 = 53;

/// Map an HTTP status of a failed first page to its exit code.
pub fn fetch_status_exit_code(status: u16) -> u8 {
    match status {
        404 => EXIT_FETCH_NOT_FOUND,
        400..=499 => EXIT_FETCH_VALIDATION,
        _ => EXIT_FETCH_UPSTREAM,
    }
}
