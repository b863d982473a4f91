//! Inference capability: trait, availability states, and the concurrency gate.
//!
//! The loaded language model is a scarce, memory-heavy resource owned for the
//! process lifetime and injected into the translator and summarizer. Every
//! call goes through [`InferenceGate`], which caps concurrent invocations
//! with a fixed permit pool and wraps each call in a timeout. Inference being
//! slow, failing, or absent entirely is an expected condition here, never a
//! programming error.

pub mod http;
pub mod summarize;
pub mod translate;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("inference capability unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference failed: {0}")]
    Failed(String),
}

/// A text-completion capability.
///
/// `complete` blocks; it is only ever invoked through [`InferenceGate`],
/// which offloads it to a blocking worker.
pub trait Inference: Send + Sync {
    /// Backend identifier for logs.
    fn id(&self) -> &str;

    /// Run a single completion.
    fn complete(&self, prompt: &str) -> Result<String, InferenceError>;
}

/// Availability of the inference backend, surfaced at startup so the chat
/// path can degrade instead of failing.
#[derive(Debug, Clone)]
pub enum InferenceAvailability {
    Ready { backend: String },
    Disabled { reason: String },
    Unreachable { url: String, error: String },
}

impl InferenceAvailability {
    pub fn is_ready(&self) -> bool {
        matches!(self, InferenceAvailability::Ready { .. })
    }

    pub fn summary(&self) -> String {
        match self {
            InferenceAvailability::Ready { backend } => format!("inference ready ({backend})"),
            InferenceAvailability::Disabled { reason } => {
                format!("inference disabled: {reason}")
            }
            InferenceAvailability::Unreachable { url, error } => {
                format!("inference unreachable at {url} ({error})")
            }
        }
    }
}

/// Backend used when no inference service is configured. Every call reports
/// `Unavailable`, so callers take their documented fallback paths.
pub struct DisabledInference;

impl Inference for DisabledInference {
    fn id(&self) -> &str {
        "disabled"
    }

    fn complete(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Unavailable {
            reason: "no inference backend configured".into(),
        })
    }
}

/// Bounded concurrency gate in front of the inference backend.
///
/// Permits are acquired immediately before an invocation and never held
/// across unrelated await points. The permit rides with the blocking call,
/// so a timed-out call that is still running cannot oversubscribe the
/// model; the caller is released immediately with [`InferenceError::Timeout`].
pub struct InferenceGate {
    backend: Arc<dyn Inference>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl InferenceGate {
    pub fn new(backend: Arc<dyn Inference>, permits: usize, timeout: Duration) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(permits.max(1))),
            timeout,
        }
    }

    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    /// Run one completion under the gate.
    pub async fn complete(&self, prompt: String) -> Result<String, InferenceError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| InferenceError::Unavailable {
                reason: "inference gate closed".into(),
            })?;

        debug!(
            backend = self.backend.id(),
            prompt_chars = prompt.len(),
            "inference call"
        );
        let backend = Arc::clone(&self.backend);
        let task = tokio::task::spawn_blocking(move || {
            let out = backend.complete(&prompt);
            drop(permit);
            out
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(InferenceError::Failed(format!(
                "inference task aborted: {join}"
            ))),
            Err(_) => {
                warn!(
                    backend = self.backend.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "inference timed out; abandoning in-flight call"
                );
                Err(InferenceError::Timeout(self.timeout))
            }
        }
    }
}
