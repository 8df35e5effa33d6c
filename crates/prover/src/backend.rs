//! Proving backends.
//!
//! The orchestrator and protocol layers only see [`ProvingBackend`]. Two
//! implementations ship here: [`Groth16Backend`] proves for real with keys
//! from setup, [`MockBackend`] evaluates the public signals natively and is
//! meant for protocol tests.

use std::path::Path;

use ark_serialize::CanonicalSerialize;
use tracing::{debug, info};

use crate::prove::{
    prove_groth16, CircuitId, CircuitInputs, ProofEnvelope, ProveError, WitnessedCircuit,
};
use crate::setup::{CircuitKeys, SetupError};
use crate::verify::{check_envelope_shape, verify_envelope, VerifyError};

/// The prover/verifier pair the orchestrator drives.
pub trait ProvingBackend: Send + Sync {
    /// Prove `circuit` from named private inputs.
    fn prove(&self, circuit: CircuitId, inputs: &CircuitInputs) -> Result<ProofEnvelope, ProveError>;

    /// Check an envelope; `Ok(false)` means well-formed but invalid.
    fn verify(&self, circuit: CircuitId, envelope: &ProofEnvelope) -> Result<bool, VerifyError>;
}

/// Groth16 over BN254 with in-memory keys.
pub struct Groth16Backend {
    keys: CircuitKeys,
}

impl Groth16Backend {
    pub fn new(keys: CircuitKeys) -> Self {
        Self { keys }
    }

    /// Load `.zkey` and `.vkey.json` artifacts from a build directory.
    pub fn from_build_dir(dir: &Path) -> Result<Self, SetupError> {
        let keys = CircuitKeys::load_from_directory(dir)?;
        info!(
            dir = %dir.display(),
            blacklist_depth = keys.not_blacklisted.depth,
            payment_depth = keys.payment.depth,
            "Loaded Groth16 keys"
        );
        Ok(Self::new(keys))
    }

    pub fn keys(&self) -> &CircuitKeys {
        &self.keys
    }
}

impl ProvingBackend for Groth16Backend {
    fn prove(&self, circuit: CircuitId, inputs: &CircuitInputs) -> Result<ProofEnvelope, ProveError> {
        let keys = self.keys.get(circuit);
        prove_groth16(&keys.proving_key, circuit, inputs, keys.depth)
    }

    fn verify(&self, circuit: CircuitId, envelope: &ProofEnvelope) -> Result<bool, VerifyError> {
        verify_envelope(&self.keys.get(circuit).verifying_key, circuit, envelope)
    }
}

const MOCK_MARKER: &[u8] = b"shieldlist-mock-proof";

/// Backend that skips the proof system.
///
/// Inputs are validated and public signals computed exactly as for Groth16.
/// The "proof" is a marker followed by the circuit name and the serialized
/// signals, so any edit to the signals makes verification return false. It
/// offers no soundness and must not guard anything real.
pub struct MockBackend {
    blacklist_depth: usize,
    payment_depth: usize,
}

impl MockBackend {
    /// Both circuits at the same tree depth.
    pub fn new(depth: usize) -> Self {
        Self::with_depths(depth, depth)
    }

    pub fn with_depths(blacklist_depth: usize, payment_depth: usize) -> Self {
        info!("Using mock proving backend (no actual proving)");
        Self {
            blacklist_depth,
            payment_depth,
        }
    }

    fn depth(&self, circuit: CircuitId) -> usize {
        match circuit {
            CircuitId::NotBlacklisted => self.blacklist_depth,
            CircuitId::ProofOfPayment => self.payment_depth,
        }
    }

    fn binding(circuit: CircuitId, signals: &[ark_bn254::Fr]) -> Result<Vec<u8>, ProveError> {
        let mut bytes = MOCK_MARKER.to_vec();
        bytes.extend_from_slice(circuit.name().as_bytes());
        for signal in signals {
            signal
                .serialize_compressed(&mut bytes)
                .map_err(|e| ProveError::Serialization(e.to_string()))?;
        }
        Ok(bytes)
    }
}

impl ProvingBackend for MockBackend {
    fn prove(&self, circuit: CircuitId, inputs: &CircuitInputs) -> Result<ProofEnvelope, ProveError> {
        let witnessed = WitnessedCircuit::build(circuit, inputs, self.depth(circuit))?;
        let public_signals = witnessed.public_inputs();
        debug!(%circuit, "Mock proving");

        Ok(ProofEnvelope {
            circuit,
            proof: Self::binding(circuit, &public_signals)?,
            public_signals,
        })
    }

    fn verify(&self, circuit: CircuitId, envelope: &ProofEnvelope) -> Result<bool, VerifyError> {
        check_envelope_shape(circuit, envelope)?;
        let expected = Self::binding(circuit, &envelope.public_signals)
            .map_err(|e| VerifyError::Verification(e.to_string()))?;
        Ok(envelope.proof == expected)
    }
}
