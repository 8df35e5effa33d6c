//! Proof generation and acceptance for blacklist and payment proofs.
//!
//! This crate provides utilities for:
//! - Trusted setup (generating proving and verifying keys, build artifacts)
//! - Proof generation and verification behind a pluggable backend
//! - Orchestrating proofs on a blocking pool
//! - Nullifier tracking and protocol-level acceptance checks

pub mod backend;
pub mod config;
pub mod orchestrator;
pub mod protocol;
pub mod prove;
pub mod registry;
pub mod setup;
pub mod verify;


pub use backend::{Groth16Backend, MockBackend, ProvingBackend};
pub use config::{Config, ConfigError};
pub use orchestrator::{ProofOrchestrator, ProofTask};
pub use protocol::{
    accept_not_blacklisted, accept_payment, blacklist_identifiers, capture_path,
    not_blacklisted_inputs, payment_inputs, record_payment, shared_tree, PaymentClaim,
    PaymentExpectation, Rejection, SharedTree, Verdict,
};
pub use prove::{CircuitId, CircuitInputs, InputValue, ProofEnvelope, ProveError};
pub use registry::{NullifierRegistry, NullifierScope, RegistryError, ScopePolicy};
pub use setup::{setup_all_circuits, CircuitKeyPair, CircuitKeys, SetupError};
pub use verify::{verify_envelope, VerifyError};

use ark_bn254::Fr;

/// Common field type for all operations
pub type ConstraintF = Fr;
