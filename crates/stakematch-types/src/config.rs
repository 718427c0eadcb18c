//! Engine configuration: the owner and oracle capabilities.
//!
//! The oracle is the single trusted identity permitted to report match
//! outcomes. It is explicit configuration state, fixed at engine
//! construction and mutable only through the owner-guarded rotation
//! operation — never ambient global state.

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Configuration for one escrow engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The deployer capability: may rotate the oracle.
    pub owner: PlayerId,
    /// The single trusted result authority.
    pub oracle: PlayerId,
}

impl EngineConfig {
    /// Build a config, rejecting nil identities.
    ///
    /// Returns `None` if either identity is nil.
    #[must_use]
    pub fn new(owner: PlayerId, oracle: PlayerId) -> Option<Self> {
        if owner.is_nil() || oracle.is_nil() {
            return None;
        }
        Some(Self { owner, oracle })
    }
}
