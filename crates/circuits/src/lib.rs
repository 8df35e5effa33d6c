//! ZK circuits for identifier blacklists and payment proofs.
//!
//! This crate provides:
//! - `poseidon`: arity-tagged Poseidon hashing, native and in-circuit
//! - `smt`: a sparse Merkle tree addressed by field elements
//! - `derive`: leaf, identity and nullifier derivations
//! - `NotBlacklistedCircuit`: prove an identifier's blacklist slot is empty
//! - `ProofOfPaymentCircuit`: prove a payment leaf exists and publish its nullifier

pub mod derive;
pub mod field;
pub mod not_blacklisted;
pub mod payment;
pub mod poseidon;
pub mod smt;


pub use derive::{
    blacklist_index, blacklist_indices, identity_commitment, identity_leaf, payment_leaf,
    payment_nullifier, BLACKLISTED, NOT_BLACKLISTED,
};
pub use field::{parse_field, random_identifier, to_decimal, to_hex, FieldError};
pub use not_blacklisted::{NotBlacklistedCircuit, NOT_BLACKLISTED_CIRCUIT};
pub use payment::{PaymentWitness, ProofOfPaymentCircuit, PAYMENT_CIRCUIT};
pub use poseidon::{hash1, hash2, hash3, hash4, poseidon_config};
pub use smt::{MerkleProof, SparseMerkleTree, TreeError, MAX_DEPTH};

use ark_bn254::Fr;

/// Common type aliases
pub type ConstraintF = Fr;
