//! Core deterministic primitives.
//!
//! Seeded randomness and state hashing. Nothing here depends on time or
//! platform.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash};
