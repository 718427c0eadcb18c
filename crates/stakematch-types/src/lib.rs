//! # stakematch-types
//!
//! Shared types, errors, and configuration for the **StakeMatch** escrow
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`MatchId`], [`PlayerId`]
//! - **Match model**: [`MatchRecord`], [`MatchState`], [`MatchOutcome`]
//! - **Events**: [`EscrowEvent`], [`EventKind`], [`Payout`]
//! - **Configuration**: [`EngineConfig`] (owner + oracle capabilities)
//! - **Errors**: [`EscrowError`] with `SM_ERR_` prefix codes

pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod outcome;
pub mod record;

// Re-export all primary types at crate root for ergonomic imports:
//   use stakematch_types::{MatchId, MatchRecord, EscrowError, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use outcome::*;
pub use record::*;
