//! Groth16 verification of proof envelopes.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_serialize::CanonicalDeserialize;
use ark_snark::SNARK;
use thiserror::Error;

use crate::prove::{CircuitId, ProofEnvelope};

/// Errors during verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Malformed proof envelope: {0}")]
    MalformedEnvelope(String),
    #[error("Malformed verifying key: {0}")]
    MalformedKey(String),
    #[error("Verification failed: {0}")]
    Verification(String),
    #[error("Unknown circuit: {0}")]
    UnknownCircuit(String),
}

/// Check the envelope is shaped for `circuit`: right id, right signal count.
pub fn check_envelope_shape(circuit: CircuitId, envelope: &ProofEnvelope) -> Result<(), VerifyError> {
    if envelope.circuit != circuit {
        return Err(VerifyError::MalformedEnvelope(format!(
            "envelope is for {}, expected {}",
            envelope.circuit, circuit
        )));
    }
    if envelope.public_signals.len() != circuit.n_public() {
        return Err(VerifyError::MalformedEnvelope(format!(
            "{} public signals, {} expects {}",
            envelope.public_signals.len(),
            circuit,
            circuit.n_public()
        )));
    }
    Ok(())
}

/// Deserialize a compressed verifying key.
pub fn parse_verifying_key(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, VerifyError> {
    VerifyingKey::deserialize_compressed(bytes).map_err(|e| VerifyError::MalformedKey(e.to_string()))
}

/// Verify an envelope against a circuit's verifying key.
///
/// Returns `Ok(false)` for a well-formed proof that does not verify.
pub fn verify_envelope(
    vk: &VerifyingKey<Bn254>,
    circuit: CircuitId,
    envelope: &ProofEnvelope,
) -> Result<bool, VerifyError> {
    check_envelope_shape(circuit, envelope)?;

    if vk.gamma_abc_g1.len() != circuit.n_public() + 1 {
        return Err(VerifyError::MalformedKey(format!(
            "key has {} public inputs, {} expects {}",
            vk.gamma_abc_g1.len().saturating_sub(1),
            circuit,
            circuit.n_public()
        )));
    }

    let proof = Proof::<Bn254>::deserialize_compressed(envelope.proof.as_slice())
        .map_err(|e| VerifyError::MalformedEnvelope(e.to_string()))?;

    let public_inputs: &[Fr] = &envelope.public_signals;
    Groth16::<Bn254>::verify(vk, public_inputs, &proof)
        .map_err(|e| VerifyError::Verification(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prove::{prove_groth16, CircuitInputs};
    use crate::setup::setup_payment;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use shieldlist_circuits::{payment_leaf, SparseMerkleTree};

    const DEPTH: usize = 6;

    fn payment_envelope(keys: &crate::setup::CircuitKeyPair) -> (ProofEnvelope, Fr) {
        let leaf = payment_leaf(Fr::from(10u64), Fr::from(20u64), Fr::from(30u64));
        let mut tree = SparseMerkleTree::new(DEPTH).unwrap();
        tree.update(Fr::from(9u64), leaf).unwrap();

        let inputs = CircuitInputs::new()
            .with_scalar("rid", Fr::from(10u64))
            .with_scalar("payId", Fr::from(20u64))
            .with_scalar("payCycle", Fr::from(30u64))
            .with_array("merkleProof", tree.proof(Fr::from(9u64)).unwrap().into_path())
            .with_scalar("idNullifier", Fr::from(1u64))
            .with_scalar("idTrapdoor", Fr::from(2u64))
            .with_scalar("leafIndex", Fr::from(9u64));

        let envelope =
            prove_groth16(&keys.proving_key, CircuitId::ProofOfPayment, &inputs, DEPTH).unwrap();
        (envelope, tree.root())
    }

    #[test]
    fn test_verify_payment() {
        let mut rng = StdRng::seed_from_u64(42);
        let keys = setup_payment(&mut rng, DEPTH).unwrap();
        let (envelope, root) = payment_envelope(&keys);

        assert_eq!(envelope.signal(0), Some(root));
        let valid = verify_envelope(&keys.verifying_key, CircuitId::ProofOfPayment, &envelope).unwrap();
        assert!(valid);
    }

    #[test]
    fn test_verify_wrong_signal_fails() {
        let mut rng = StdRng::seed_from_u64(42);
        let keys = setup_payment(&mut rng, DEPTH).unwrap();
        let (mut envelope, _) = payment_envelope(&keys);

        envelope.public_signals[1] = Fr::from(99999u64);
        let valid = verify_envelope(&keys.verifying_key, CircuitId::ProofOfPayment, &envelope).unwrap();
        assert!(!valid);
    }

    #[test]
    fn test_malformed_shapes() {
        let mut rng = StdRng::seed_from_u64(42);
        let keys = setup_payment(&mut rng, DEPTH).unwrap();
        let (envelope, _) = payment_envelope(&keys);

        let mut short = envelope.clone();
        short.public_signals.pop();
        assert!(matches!(
            verify_envelope(&keys.verifying_key, CircuitId::ProofOfPayment, &short),
            Err(VerifyError::MalformedEnvelope(_))
        ));

        let mut garbled = envelope.clone();
        garbled.proof = vec![1, 2, 3];
        assert!(matches!(
            verify_envelope(&keys.verifying_key, CircuitId::ProofOfPayment, &garbled),
            Err(VerifyError::MalformedEnvelope(_))
        ));

        assert!(matches!(
            parse_verifying_key(&[0u8; 5]),
            Err(VerifyError::MalformedKey(_))
        ));
    }
}
