//! Proof orchestration over an injected backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backend::ProvingBackend;
use crate::prove::{CircuitId, CircuitInputs, ProofEnvelope, ProveError};
use crate::verify::VerifyError;

/// Drives a [`ProvingBackend`] and times its work.
#[derive(Clone)]
pub struct ProofOrchestrator {
    backend: Arc<dyn ProvingBackend>,
}

impl ProofOrchestrator {
    pub fn new(backend: Arc<dyn ProvingBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn ProvingBackend> {
        &self.backend
    }

    /// Generate a proof, blocking the calling thread.
    pub fn request_proof(
        &self,
        circuit: CircuitId,
        inputs: &CircuitInputs,
    ) -> Result<ProofEnvelope, ProveError> {
        let start = Instant::now();
        match self.backend.prove(circuit, inputs) {
            Ok(envelope) => {
                info!(
                    %circuit,
                    signals = envelope.public_signals.len(),
                    elapsed = ?start.elapsed(),
                    "Proof generated"
                );
                Ok(envelope)
            }
            Err(e) => {
                warn!(%circuit, error = %e, transient = e.is_transient(), "Proof generation failed");
                Err(e)
            }
        }
    }

    /// Verify an envelope. `Ok(false)` is a normal outcome, not an error.
    pub fn check_proof(
        &self,
        circuit: CircuitId,
        envelope: &ProofEnvelope,
    ) -> Result<bool, VerifyError> {
        let start = Instant::now();
        let valid = self.backend.verify(circuit, envelope)?;
        info!(%circuit, valid, elapsed = ?start.elapsed(), "Proof checked");
        Ok(valid)
    }

    /// Run proof generation on the blocking pool.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_proof(&self, circuit: CircuitId, inputs: CircuitInputs) -> ProofTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let orchestrator = self.clone();

        let handle = tokio::task::spawn_blocking(move || {
            if flag.load(Ordering::Acquire) {
                return Err(ProveError::Cancelled);
            }
            let result = orchestrator.request_proof(circuit, &inputs);
            // A result produced after cancellation is discarded.
            if flag.load(Ordering::Acquire) {
                return Err(ProveError::Cancelled);
            }
            result
        });

        ProofTask { handle, cancelled }
    }
}

/// Handle to a proof running on the blocking pool.
pub struct ProofTask {
    handle: JoinHandle<Result<ProofEnvelope, ProveError>>,
    cancelled: Arc<AtomicBool>,
}

impl ProofTask {
    /// Request cancellation. A proof already running completes in the
    /// background, but its result is dropped and `join` reports `Cancelled`.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn join(self) -> Result<ProofEnvelope, ProveError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ProveError::Cancelled),
            Err(e) => Err(ProveError::ProofGeneration(format!("proof task failed: {}", e))),
        }
    }
}
