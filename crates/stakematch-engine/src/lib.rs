//! # stakematch-engine
//!
//! The **Escrow Settlement Engine**: a deterministic state machine keyed
//! by match identifier, coordinating a two-party wagered match with a
//! trusted result oracle.
//!
//! ## Architecture
//!
//! 1. **[`EscrowEngine`]**: the match ledger and its guarded operations
//!    (`create_match`, `deposit`, `submit_result`, `cancel_match`,
//!    `rotate_oracle`, `withdraw_credit`)
//! 2. **[`ValueTransfer`]**: the pluggable outbound funds seam;
//!    [`CashLedger`] is the in-memory reference implementation
//! 3. **[`PendingCredits`]**: deferred payouts for recipients that reject
//!    a transfer, withdrawable exactly once
//!
//! ## Operation flow
//!
//! ```text
//! create_match → deposit ×2 → READY → submit_result → SETTLED → pay()
//!             └→ cancel_match → CANCELLED → refund()
//! ```
//!
//! Every operation is atomic and serialized through `&mut self`; outbound
//! transfers are always the last effect, after all bookkeeping commits.

pub mod credits;
pub mod engine;
pub mod transfer;

pub use credits::PendingCredits;
pub use engine::EscrowEngine;
pub use transfer::{CashLedger, TransferError, ValueTransfer};
