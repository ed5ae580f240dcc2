//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts that batch-process certificates branch on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                   |
//! |---------|------------|-----------------------------------------------|
//! | 0       | Universal  | Success                                       |
//! | 1       | Universal  | General error (unspecified)                   |
//! | 2       | Universal  | CLI usage error (bad args, missing input)     |
//! | 3-9     | Input      | Reading certificates and configuration        |
//! | 10-19   | Process    | Reconciliation, registry, report, export      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant `CliError` constructor

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - every certificate processed and, where requested, reported.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Input file cannot be read.
pub const EXIT_IO: u8 = 3;

/// Input cannot be understood (installation whitelist, certificate without a tag).
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Process (10-19)
// =============================================================================

/// At least one certificate was left with unresolved divergences;
/// its report was not generated.
pub const EXIT_PENDING: u8 = 10;

/// Report target is open in another program.
pub const EXIT_REPORT_LOCKED: u8 = 11;

/// Registry database error (open, query or update).
pub const EXIT_REGISTRY: u8 = 12;

/// Report rendering or XML export failed.
pub const EXIT_EXPORT: u8 = 13;
