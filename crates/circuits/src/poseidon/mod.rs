//! Poseidon hash primitives for BN254.
//!
//! `hash1`..`hash4` are fixed-arity hashes: the sponge absorbs the arity as a
//! leading field element before the inputs, so outputs of different arities
//! never share an encoding. Native and in-circuit versions agree bit for bit.

mod config;
mod native;
mod gadgets;


pub use native::{hash1, hash2, hash3, hash4};
pub use gadgets::{hash1_var, hash2_var, hash3_var, hash4_var};
pub use config::poseidon_config;
