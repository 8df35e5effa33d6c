//! Blacklist and payment protocols on top of the orchestrator.
//!
//! Input assembly reads a sibling path out of a shared tree and releases the
//! lock before any proving starts. Acceptance verifies the proof, then checks
//! its public signals against what the verifier expects: root first, then
//! identity, then the nullifier, which is recorded only when every other
//! check has passed.

use std::sync::{Arc, PoisonError, RwLock};

use ark_bn254::Fr;
use tracing::{debug, info, warn};

use shieldlist_circuits::{
    blacklist_index, blacklist_indices, identity_commitment, identity_leaf, payment_leaf,
    payment_nullifier, MerkleProof, SparseMerkleTree, TreeError, BLACKLISTED,
};

use crate::orchestrator::ProofOrchestrator;
use crate::prove::{CircuitId, CircuitInputs, ProofEnvelope};
use crate::registry::{NullifierRegistry, RegistryError};
use crate::verify::VerifyError;

/// A tree shared between one writer and many path readers.
pub type SharedTree = Arc<RwLock<SparseMerkleTree>>;

pub fn shared_tree(tree: SparseMerkleTree) -> SharedTree {
    Arc::new(RwLock::new(tree))
}

/// Root and sibling path copied out of a tree at one instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedPath {
    pub root: Fr,
    pub proof: MerkleProof,
}

/// Copy the path for `index`; the read lock is held only for the copy.
pub fn capture_path(tree: &SharedTree, index: Fr) -> Result<CapturedPath, TreeError> {
    let tree = tree.read().unwrap_or_else(PoisonError::into_inner);
    Ok(CapturedPath {
        root: tree.root(),
        proof: tree.proof(index)?,
    })
}

/// Mark identifiers as blacklisted. Returns the new root.
pub fn blacklist_identifiers(tree: &SharedTree, identifiers: &[Fr]) -> Result<Fr, TreeError> {
    let indices = blacklist_indices(identifiers);

    let mut tree = tree.write().unwrap_or_else(PoisonError::into_inner);
    let mut root = tree.root();
    for index in indices {
        root = tree.update(index, BLACKLISTED)?;
    }
    info!(count = identifiers.len(), "Identifiers blacklisted");
    Ok(root)
}

/// Inputs for `proveNotBlacklisted`.
pub fn not_blacklisted_inputs(tree: &SharedTree, identifier: Fr) -> Result<CircuitInputs, TreeError> {
    let captured = capture_path(tree, blacklist_index(identifier))?;
    debug!(depth = captured.proof.depth(), "Assembled blacklist inputs");

    Ok(CircuitInputs::new()
        .with_scalar("IMEI", identifier)
        .with_array("path_elements", captured.proof.into_path()))
}

/// What the payer knows about one payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentClaim {
    pub rid: Fr,
    pub pay_id: Fr,
    pub pay_cycle: u64,
    pub leaf_index: Fr,
    pub id_nullifier: Fr,
    pub id_trapdoor: Fr,
}

impl PaymentClaim {
    pub fn leaf(&self) -> Fr {
        payment_leaf(self.rid, self.pay_id, Fr::from(self.pay_cycle))
    }

    /// Identity leaf the verifier expects in signal 1.
    pub fn identity(&self) -> Fr {
        identity_leaf(identity_commitment(self.id_nullifier, self.id_trapdoor))
    }

    pub fn nullifier(&self) -> Fr {
        payment_nullifier(self.rid, self.pay_id, Fr::from(self.pay_cycle), self.leaf_index)
    }
}

/// Store a payment leaf at the claim's index. Returns the new root.
pub fn record_payment(tree: &SharedTree, claim: &PaymentClaim) -> Result<Fr, TreeError> {
    let mut tree = tree.write().unwrap_or_else(PoisonError::into_inner);
    tree.update(claim.leaf_index, claim.leaf())
}

/// Inputs for `proofOfPayment`.
pub fn payment_inputs(tree: &SharedTree, claim: &PaymentClaim) -> Result<CircuitInputs, TreeError> {
    let captured = capture_path(tree, claim.leaf_index)?;
    debug!(pay_cycle = claim.pay_cycle, "Assembled payment inputs");

    Ok(CircuitInputs::new()
        .with_scalar("rid", claim.rid)
        .with_scalar("payId", claim.pay_id)
        .with_scalar("payCycle", Fr::from(claim.pay_cycle))
        .with_array("merkleProof", captured.proof.into_path())
        .with_scalar("idNullifier", claim.id_nullifier)
        .with_scalar("idTrapdoor", claim.id_trapdoor)
        .with_scalar("leafIndex", claim.leaf_index))
}

/// What the verifier holds when checking a payment proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentExpectation {
    pub root: Fr,
    pub identity: Fr,
    pub pay_cycle: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    ProofInvalid,
    RootMismatch,
    IdentityMismatch,
    DuplicateNullifier,
    /// The envelope has no signal at this position.
    MissingSignal(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

fn reject(circuit: CircuitId, reason: Rejection) -> Verdict {
    warn!(%circuit, ?reason, "Proof rejected");
    Verdict::Rejected(reason)
}

fn rejected_proof(
    orchestrator: &ProofOrchestrator,
    circuit: CircuitId,
    envelope: &ProofEnvelope,
) -> Result<Option<Verdict>, VerifyError> {
    if !orchestrator.check_proof(circuit, envelope)? {
        return Ok(Some(reject(circuit, Rejection::ProofInvalid)));
    }
    Ok(None)
}

fn signal(circuit: CircuitId, envelope: &ProofEnvelope, position: usize) -> Result<Fr, Verdict> {
    envelope
        .signal(position)
        .ok_or_else(|| reject(circuit, Rejection::MissingSignal(position)))
}

/// Accept a non-membership proof if it verifies against `expected_root`.
pub fn accept_not_blacklisted(
    orchestrator: &ProofOrchestrator,
    expected_root: Fr,
    envelope: &ProofEnvelope,
) -> Result<Verdict, VerifyError> {
    let circuit = CircuitId::NotBlacklisted;
    if let Some(verdict) = rejected_proof(orchestrator, circuit, envelope)? {
        return Ok(verdict);
    }

    let root = match signal(circuit, envelope, 0) {
        Ok(root) => root,
        Err(verdict) => return Ok(verdict),
    };
    if root != expected_root {
        return Ok(reject(circuit, Rejection::RootMismatch));
    }

    info!(%circuit, "Proof accepted");
    Ok(Verdict::Accepted)
}

/// Accept a payment proof and spend its nullifier.
pub fn accept_payment(
    orchestrator: &ProofOrchestrator,
    registry: &NullifierRegistry,
    expected: &PaymentExpectation,
    envelope: &ProofEnvelope,
) -> Result<Verdict, VerifyError> {
    let circuit = CircuitId::ProofOfPayment;
    if let Some(verdict) = rejected_proof(orchestrator, circuit, envelope)? {
        return Ok(verdict);
    }

    let signals = (0..3)
        .map(|i| signal(circuit, envelope, i))
        .collect::<Result<Vec<_>, _>>();
    let signals = match signals {
        Ok(signals) => signals,
        Err(verdict) => return Ok(verdict),
    };

    if signals[0] != expected.root {
        return Ok(reject(circuit, Rejection::RootMismatch));
    }
    if signals[1] != expected.identity {
        return Ok(reject(circuit, Rejection::IdentityMismatch));
    }

    let scope = registry.scope_for(expected.pay_cycle);
    match registry.insert(scope, signals[2]) {
        Ok(()) => {
            info!(%circuit, %scope, "Proof accepted");
            Ok(Verdict::Accepted)
        }
        Err(RegistryError::DuplicateNullifier { .. }) => {
            Ok(reject(circuit, Rejection::DuplicateNullifier))
        }
    }
}
