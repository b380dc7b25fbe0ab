//! # scango-cli — Command Line for ScanGo
//!
//! Provides the `scango` binary, a thin shell over [`scango_client`].
//!
//! ## Subcommands
//!
//! - `scango checkout`: submit a cart file as a shopper.
//! - `scango mark-paid`: cashier confirms a cash payment.
//! - `scango verify-exit` / `scango verify-proof`: guard scans a QR.
//! - `scango status`: read a receipt, or `--watch` it until verified.
//! - `scango balance`: reward balance of a wallet.
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success; for guard commands, exit allowed |
//! | 1 | Request failed (transport, validation, auth, not found) |
//! | 3 | Guard command answered, but the exit was refused |

pub mod order;
pub mod staff;
pub mod status;

/// Exit code for a refused exit.
pub const EXIT_DENIED: u8 = 3;
