//! Proof generation: circuit identifiers, named inputs, witness extraction and
//! the proof envelope handed between prover and verifier.

use std::collections::BTreeMap;
use std::fmt;

use ark_bn254::{Bn254, Fr};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Groth16, ProvingKey};
use ark_serialize::CanonicalSerialize;
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shieldlist_circuits::{
    blacklist_index, parse_field, to_decimal, MerkleProof, NotBlacklistedCircuit,
    PaymentWitness, ProofOfPaymentCircuit, NOT_BLACKLISTED_CIRCUIT, PAYMENT_CIRCUIT,
};

use crate::verify::VerifyError;

/// Errors during proof generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProveError {
    #[error("Invalid circuit inputs: {0}")]
    InvalidInputs(String),
    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Proof generation was cancelled")]
    Cancelled,
}

impl ProveError {
    /// Whether retrying the same request can succeed.
    ///
    /// Input and encoding failures are deterministic; a cancelled or
    /// interrupted backend run is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProveError::ProofGeneration(_) | ProveError::Cancelled)
    }
}

/// The circuits this system proves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CircuitId {
    #[serde(rename = "proveNotBlacklisted")]
    NotBlacklisted,
    #[serde(rename = "proofOfPayment")]
    ProofOfPayment,
}

impl CircuitId {
    pub const ALL: [CircuitId; 2] = [CircuitId::NotBlacklisted, CircuitId::ProofOfPayment];

    /// Name used for key artifacts and envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            CircuitId::NotBlacklisted => NOT_BLACKLISTED_CIRCUIT,
            CircuitId::ProofOfPayment => PAYMENT_CIRCUIT,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Number of public signals the circuit exposes.
    pub fn n_public(&self) -> usize {
        match self {
            CircuitId::NotBlacklisted => 1,
            CircuitId::ProofOfPayment => 3,
        }
    }

    /// Input names the circuit expects, exactly.
    pub fn input_names(&self) -> &'static [&'static str] {
        match self {
            CircuitId::NotBlacklisted => &["IMEI", "path_elements"],
            CircuitId::ProofOfPayment => &[
                "rid",
                "payId",
                "payCycle",
                "merkleProof",
                "idNullifier",
                "idTrapdoor",
                "leafIndex",
            ],
        }
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single named circuit input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    Scalar(Fr),
    Array(Vec<Fr>),
}

/// Named private inputs for one proof request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitInputs {
    values: BTreeMap<String, InputValue>,
}

impl CircuitInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, name: &str, value: Fr) -> Self {
        self.insert(name, InputValue::Scalar(value));
        self
    }

    pub fn with_array(mut self, name: &str, values: Vec<Fr>) -> Self {
        self.insert(name, InputValue::Array(values));
        self
    }

    /// Set an input, returning the previous value under that name.
    pub fn insert(&mut self, name: &str, value: InputValue) -> Option<InputValue> {
        self.values.insert(name.to_string(), value)
    }

    pub fn get(&self, name: &str) -> Option<&InputValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn scalar(&self, name: &str) -> Result<Fr, ProveError> {
        match self.values.get(name) {
            Some(InputValue::Scalar(v)) => Ok(*v),
            Some(InputValue::Array(_)) => Err(ProveError::InvalidInputs(format!(
                "{} must be a scalar",
                name
            ))),
            None => Err(ProveError::InvalidInputs(format!("missing input {}", name))),
        }
    }

    pub fn array(&self, name: &str) -> Result<&[Fr], ProveError> {
        match self.values.get(name) {
            Some(InputValue::Array(v)) => Ok(v),
            Some(InputValue::Scalar(_)) => Err(ProveError::InvalidInputs(format!(
                "{} must be an array",
                name
            ))),
            None => Err(ProveError::InvalidInputs(format!("missing input {}", name))),
        }
    }

    /// Reject names the circuit does not declare.
    fn check_names(&self, circuit: CircuitId) -> Result<(), ProveError> {
        let expected = circuit.input_names();
        if let Some(unknown) = self.names().find(|n| !expected.contains(n)) {
            return Err(ProveError::InvalidInputs(format!(
                "unknown input {} for {}",
                unknown, circuit
            )));
        }
        Ok(())
    }
}

/// Proof bytes together with the public signals they attest to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofEnvelope {
    pub circuit: CircuitId,
    pub proof: Vec<u8>,
    pub public_signals: Vec<Fr>,
}

#[derive(Serialize, Deserialize)]
struct EnvelopeJson {
    circuit: String,
    proof: String,
    #[serde(rename = "publicSignals")]
    public_signals: Vec<String>,
}

impl ProofEnvelope {
    pub fn signal(&self, position: usize) -> Option<Fr> {
        self.public_signals.get(position).copied()
    }

    /// JSON form: hex proof bytes, decimal signals.
    pub fn to_json(&self) -> Result<String, ProveError> {
        let json = EnvelopeJson {
            circuit: self.circuit.name().to_string(),
            proof: format!("0x{}", hex::encode(&self.proof)),
            public_signals: self.public_signals.iter().map(to_decimal).collect(),
        };
        serde_json::to_string(&json).map_err(|e| ProveError::Serialization(e.to_string()))
    }

    pub fn from_json(input: &str) -> Result<Self, VerifyError> {
        let json: EnvelopeJson = serde_json::from_str(input)
            .map_err(|e| VerifyError::MalformedEnvelope(e.to_string()))?;
        let circuit = CircuitId::from_name(&json.circuit)
            .ok_or_else(|| VerifyError::UnknownCircuit(json.circuit.clone()))?;

        let proof_hex = json.proof.strip_prefix("0x").unwrap_or(&json.proof);
        let proof =
            hex::decode(proof_hex).map_err(|e| VerifyError::MalformedEnvelope(e.to_string()))?;

        let public_signals = json
            .public_signals
            .iter()
            .map(|s| parse_field(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| VerifyError::MalformedEnvelope(e.to_string()))?;

        Ok(Self {
            circuit,
            proof,
            public_signals,
        })
    }
}

/// A circuit instance with its witness extracted from named inputs.
#[derive(Clone)]
pub enum WitnessedCircuit {
    NotBlacklisted(NotBlacklistedCircuit),
    ProofOfPayment(ProofOfPaymentCircuit),
}

impl WitnessedCircuit {
    /// Validate inputs against a tree of `depth` levels and build the circuit.
    ///
    /// Rejects unknown or missing names, a sibling path whose length differs
    /// from `depth`, and any index that does not fit in `depth` bits.
    pub fn build(
        circuit: CircuitId,
        inputs: &CircuitInputs,
        depth: usize,
    ) -> Result<Self, ProveError> {
        inputs.check_names(circuit)?;

        match circuit {
            CircuitId::NotBlacklisted => {
                let identifier = inputs.scalar("IMEI")?;
                let proof = path_of(inputs, "path_elements", depth)?;
                check_index(blacklist_index(identifier), depth, "blacklist index")?;
                Ok(Self::NotBlacklisted(NotBlacklistedCircuit::new(identifier, proof)))
            }
            CircuitId::ProofOfPayment => {
                let witness = PaymentWitness {
                    rid: inputs.scalar("rid")?,
                    pay_id: inputs.scalar("payId")?,
                    pay_cycle: inputs.scalar("payCycle")?,
                    leaf_index: inputs.scalar("leafIndex")?,
                    id_nullifier: inputs.scalar("idNullifier")?,
                    id_trapdoor: inputs.scalar("idTrapdoor")?,
                };
                let proof = path_of(inputs, "merkleProof", depth)?;
                check_index(witness.leaf_index, depth, "leafIndex")?;
                Ok(Self::ProofOfPayment(ProofOfPaymentCircuit::new(witness, proof)))
            }
        }
    }

    pub fn id(&self) -> CircuitId {
        match self {
            Self::NotBlacklisted(_) => CircuitId::NotBlacklisted,
            Self::ProofOfPayment(_) => CircuitId::ProofOfPayment,
        }
    }

    /// Public signals in circuit order.
    pub fn public_inputs(&self) -> Vec<Fr> {
        match self {
            Self::NotBlacklisted(c) => c.public_inputs(),
            Self::ProofOfPayment(c) => c.public_inputs(),
        }
    }
}

fn path_of(inputs: &CircuitInputs, name: &str, depth: usize) -> Result<MerkleProof, ProveError> {
    let path = inputs.array(name)?;
    if path.len() != depth {
        return Err(ProveError::InvalidInputs(format!(
            "{} has {} elements, expected {}",
            name,
            path.len(),
            depth
        )));
    }
    Ok(MerkleProof::new(path.to_vec()))
}

fn check_index(index: Fr, depth: usize, what: &str) -> Result<(), ProveError> {
    if index.into_bigint().num_bits() as usize > depth {
        return Err(ProveError::InvalidInputs(format!(
            "{} does not fit a tree of depth {}",
            what, depth
        )));
    }
    Ok(())
}

/// Generate a Groth16 proof for `circuit` from named inputs.
pub fn prove_groth16(
    pk: &ProvingKey<Bn254>,
    circuit: CircuitId,
    inputs: &CircuitInputs,
    depth: usize,
) -> Result<ProofEnvelope, ProveError> {
    let witnessed = WitnessedCircuit::build(circuit, inputs, depth)?;
    let public_signals = witnessed.public_inputs();

    let mut rng = StdRng::from_entropy();
    let proof = match witnessed {
        WitnessedCircuit::NotBlacklisted(c) => Groth16::<Bn254>::prove(pk, c, &mut rng),
        WitnessedCircuit::ProofOfPayment(c) => Groth16::<Bn254>::prove(pk, c, &mut rng),
    }
    .map_err(|e| ProveError::ProofGeneration(e.to_string()))?;

    let mut bytes = Vec::new();
    proof
        .serialize_compressed(&mut bytes)
        .map_err(|e| ProveError::Serialization(e.to_string()))?;

    Ok(ProofEnvelope {
        circuit,
        proof: bytes,
        public_signals,
    })
}
