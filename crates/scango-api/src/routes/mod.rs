//! # API Route Modules
//!
//! - `orders`: shopper checkout.
//! - `cashier`: cash payment confirmation (staff, `cashier` role).
//! - `guard`: exit verification by order hash or scanned proof (staff,
//!   `guard` role).
//! - `receipts`: receipt status reads, with the chain tie-break applied.
//! - `users`: reward balance per wallet.

pub mod cashier;
pub mod guard;
pub mod orders;
pub mod receipts;
pub mod users;
