//! Trusted setup utilities for generating proving and verifying keys.
//!
//! Keys are written to a build directory as two artifacts per circuit:
//! `<circuit>.zkey` holds the compressed proving key and
//! `<circuit>.vkey.json` describes the verifying key.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use shieldlist_circuits::{NotBlacklistedCircuit, ProofOfPaymentCircuit, MAX_DEPTH};

use crate::prove::CircuitId;

/// Errors that can occur during setup
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Invalid tree depth {depth} (must be 1..={max})")]
    InvalidDepth { depth: usize, max: usize },
    #[error("Circuit setup failed: {0}")]
    CircuitSetup(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
    #[error("Artifact mismatch in {path}: {reason}")]
    ArtifactMismatch { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keys for a single circuit at a fixed tree depth
#[derive(Clone)]
pub struct CircuitKeyPair {
    pub circuit: CircuitId,
    pub depth: usize,
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

impl CircuitKeyPair {
    /// Serialize proving key to bytes
    pub fn serialize_pk(&self) -> Result<Vec<u8>, SetupError> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| SetupError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Serialize verifying key to bytes
    pub fn serialize_vk(&self) -> Result<Vec<u8>, SetupError> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| SetupError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize proving key from bytes
    pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, SetupError> {
        ProvingKey::deserialize_compressed(bytes)
            .map_err(|e| SetupError::Deserialization(e.to_string()))
    }

    /// Deserialize verifying key from bytes
    pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, SetupError> {
        VerifyingKey::deserialize_compressed(bytes)
            .map_err(|e| SetupError::Deserialization(e.to_string()))
    }

    /// Describe the verifying key as a vkey artifact.
    pub fn vkey_artifact(&self) -> Result<VkeyArtifact, SetupError> {
        Ok(VkeyArtifact {
            protocol: "groth16".to_string(),
            curve: "bn254".to_string(),
            circuit: self.circuit.name().to_string(),
            depth: self.depth,
            n_public: self.circuit.n_public(),
            vk: format!("0x{}", hex::encode(self.serialize_vk()?)),
        })
    }
}

/// Contents of `<circuit>.vkey.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkeyArtifact {
    pub protocol: String,
    pub curve: String,
    pub circuit: String,
    pub depth: usize,
    #[serde(rename = "nPublic")]
    pub n_public: usize,
    pub vk: String,
}

impl VkeyArtifact {
    pub fn verifying_key(&self) -> Result<VerifyingKey<Bn254>, SetupError> {
        let hex_str = self.vk.strip_prefix("0x").unwrap_or(&self.vk);
        let bytes = hex::decode(hex_str).map_err(|e| SetupError::Deserialization(e.to_string()))?;
        CircuitKeyPair::deserialize_vk(&bytes)
    }
}

pub fn zkey_path(dir: &Path, circuit: CircuitId) -> PathBuf {
    dir.join(format!("{}.zkey", circuit.name()))
}

pub fn vkey_path(dir: &Path, circuit: CircuitId) -> PathBuf {
    dir.join(format!("{}.vkey.json", circuit.name()))
}

/// Read and check a circuit's vkey artifact without touching its proving key.
pub fn read_vkey_artifact(dir: &Path, circuit: CircuitId) -> Result<VkeyArtifact, SetupError> {
    let path = vkey_path(dir, circuit);
    let artifact: VkeyArtifact = serde_json::from_str(&std::fs::read_to_string(&path)?)?;

    if artifact.circuit != circuit.name() || artifact.n_public != circuit.n_public() {
        return Err(SetupError::ArtifactMismatch {
            path,
            reason: format!(
                "found {} with {} public signals",
                artifact.circuit, artifact.n_public
            ),
        });
    }
    Ok(artifact)
}

/// Load only the verifying key of a circuit from the build directory.
pub fn load_verifying_key(dir: &Path, circuit: CircuitId) -> Result<VerifyingKey<Bn254>, SetupError> {
    read_vkey_artifact(dir, circuit)?.verifying_key()
}

/// All circuit keys
#[derive(Clone)]
pub struct CircuitKeys {
    pub not_blacklisted: CircuitKeyPair,
    pub payment: CircuitKeyPair,
}

impl CircuitKeys {
    pub fn get(&self, circuit: CircuitId) -> &CircuitKeyPair {
        match circuit {
            CircuitId::NotBlacklisted => &self.not_blacklisted,
            CircuitId::ProofOfPayment => &self.payment,
        }
    }

    /// Save all keys to a directory
    pub fn save_to_directory(&self, dir: &Path) -> Result<(), SetupError> {
        std::fs::create_dir_all(dir)?;

        for circuit in CircuitId::ALL {
            let keys = self.get(circuit);
            std::fs::write(zkey_path(dir, circuit), keys.serialize_pk()?)?;
            std::fs::write(
                vkey_path(dir, circuit),
                serde_json::to_string_pretty(&keys.vkey_artifact()?)?,
            )?;
        }

        info!(dir = %dir.display(), "Circuit keys saved");
        Ok(())
    }

    /// Load all keys from a directory
    pub fn load_from_directory(dir: &Path) -> Result<Self, SetupError> {
        let load = |circuit: CircuitId| -> Result<CircuitKeyPair, SetupError> {
            let artifact = read_vkey_artifact(dir, circuit)?;
            Ok(CircuitKeyPair {
                circuit,
                depth: artifact.depth,
                proving_key: CircuitKeyPair::deserialize_pk(&std::fs::read(zkey_path(
                    dir, circuit,
                ))?)?,
                verifying_key: artifact.verifying_key()?,
            })
        };

        Ok(Self {
            not_blacklisted: load(CircuitId::NotBlacklisted)?,
            payment: load(CircuitId::ProofOfPayment)?,
        })
    }
}

fn check_depth(depth: usize) -> Result<(), SetupError> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(SetupError::InvalidDepth {
            depth,
            max: MAX_DEPTH,
        });
    }
    Ok(())
}

/// Run trusted setup for both circuits at `depth`.
///
/// The two setups run in parallel, each from its own RNG derived from `seed`.
pub fn setup_all_circuits(depth: usize, seed: u64) -> Result<CircuitKeys, SetupError> {
    check_depth(depth)?;

    let (not_blacklisted, payment) = rayon::join(
        || setup_not_blacklisted(&mut StdRng::seed_from_u64(seed), depth),
        || setup_payment(&mut StdRng::seed_from_u64(seed.wrapping_add(1)), depth),
    );

    Ok(CircuitKeys {
        not_blacklisted: not_blacklisted?,
        payment: payment?,
    })
}

/// Setup NotBlacklistedCircuit
pub fn setup_not_blacklisted(rng: &mut StdRng, depth: usize) -> Result<CircuitKeyPair, SetupError> {
    check_depth(depth)?;
    let start = Instant::now();

    let circuit = NotBlacklistedCircuit::empty(depth);
    let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
        .map_err(|e| SetupError::CircuitSetup(e.to_string()))?;

    info!(circuit = %CircuitId::NotBlacklisted, depth, elapsed = ?start.elapsed(), "Setup complete");
    Ok(CircuitKeyPair {
        circuit: CircuitId::NotBlacklisted,
        depth,
        proving_key: pk,
        verifying_key: vk,
    })
}

/// Setup ProofOfPaymentCircuit
pub fn setup_payment(rng: &mut StdRng, depth: usize) -> Result<CircuitKeyPair, SetupError> {
    check_depth(depth)?;
    let start = Instant::now();

    let circuit = ProofOfPaymentCircuit::empty(depth);
    let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)
        .map_err(|e| SetupError::CircuitSetup(e.to_string()))?;

    info!(circuit = %CircuitId::ProofOfPayment, depth, elapsed = ?start.elapsed(), "Setup complete");
    Ok(CircuitKeyPair {
        circuit: CircuitId::ProofOfPayment,
        depth,
        proving_key: pk,
        verifying_key: vk,
    })
}
