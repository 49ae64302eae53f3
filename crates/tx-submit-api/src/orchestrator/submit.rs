//! Transaction submission.
//!
//! ```text
//!   bytes ─► empty? ─► classify ─► open lease ─► dial ─► race ─► release
//!              │          │                       │       │
//!              ▼          ▼                       ▼       ▼
//!        Validation  Classification          Transport  Accepted | Rejected
//!         Failure       Failure               Failure   Transport | Timeout
//! ```
//!
//! Classification runs before any session exists, so bytes no era accepts
//! never cost a connection.

use ledger_era::ClassifiedTx;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::config::ConfigError;
use crate::domain::types::{NodeTarget, SubmissionOutcome};
use crate::orchestrator::session::{checked_timeout, deadline_after, race, Race, SessionLease};
use crate::ports::{EraClassifier, SessionFactory, SubmitResponse};

/// Relays one transaction per call to the node.
#[derive(Clone)]
pub struct SubmitOrchestrator {
    classifier: Arc<dyn EraClassifier>,
    sessions: Arc<dyn SessionFactory>,
    target: NodeTarget,
    timeout: Duration,
}

impl SubmitOrchestrator {
    /// Fails if `timeout` is zero or too large to turn into a deadline.
    pub fn new(
        classifier: Arc<dyn EraClassifier>,
        sessions: Arc<dyn SessionFactory>,
        target: NodeTarget,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier,
            sessions,
            target,
            timeout: checked_timeout(timeout)?,
        })
    }

    pub fn target(&self) -> &NodeTarget {
        &self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submits `tx` and reports how it ended. Opens at most one session and
    /// always closes it.
    pub async fn submit(&self, tx: &[u8]) -> SubmissionOutcome {
        if tx.is_empty() {
            return SubmissionOutcome::ValidationFailure {
                reason: "empty transaction body".to_string(),
            };
        }

        let classified = match self.classifier.classify(tx) {
            Ok(classified) => classified,
            Err(e) => {
                debug!(error = %e, len = tx.len(), "Transaction not recognised");
                return SubmissionOutcome::ClassificationFailure {
                    reason: format!("could not parse transaction to determine type: {}", e),
                };
            }
        };

        let deadline = deadline_after(self.timeout);
        let mut lease = SessionLease::open(self.sessions.as_ref());
        let outcome = self.exchange(&mut lease, &classified, tx, deadline).await;
        lease.release();

        match &outcome {
            SubmissionOutcome::Accepted { tx_id } => {
                info!(tx_id = %tx_id, era = %classified.era, "Transaction accepted");
            }
            SubmissionOutcome::Rejected { reason, .. } => {
                info!(
                    tx_id = %classified.tx_id,
                    era = %classified.era,
                    reason = %reason,
                    "Transaction rejected"
                );
            }
            SubmissionOutcome::TransportFailure { cause } => {
                warn!(
                    tx_id = %classified.tx_id,
                    node = %self.target,
                    cause = %cause,
                    "Submission failed"
                );
            }
            SubmissionOutcome::Timeout => {
                warn!(
                    tx_id = %classified.tx_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Submission timed out"
                );
            }
            other => debug!(outcome = other.label(), "Submission finished"),
        }
        outcome
    }

    async fn exchange(
        &self,
        lease: &mut SessionLease,
        classified: &ClassifiedTx,
        tx: &[u8],
        deadline: Instant,
    ) -> SubmissionOutcome {
        if let Err(e) = lease.dial(&self.target, deadline).await {
            return SubmissionOutcome::TransportFailure {
                cause: e.to_string(),
            };
        }

        let mut errors = lease.session().take_errors();
        let call = lease.session().submit_tx(classified.era, tx);

        match race(call, errors.as_mut(), deadline).await {
            Race::Completed(Ok(SubmitResponse::Accepted)) => SubmissionOutcome::Accepted {
                tx_id: classified.tx_id,
            },
            Race::Completed(Ok(SubmitResponse::Rejected { reason_cbor })) => {
                let reason = rejection_summary(&reason_cbor);
                SubmissionOutcome::Rejected {
                    reason_cbor,
                    reason,
                }
            }
            Race::Completed(Err(e)) | Race::SideChannel(e) => SubmissionOutcome::TransportFailure {
                cause: e.to_string(),
            },
            Race::TimedOut => SubmissionOutcome::Timeout,
        }
    }
}

/// Printable form of a rejection reason.
pub fn rejection_summary(reason_cbor: &[u8]) -> String {
    format!("transaction rejected: CBOR: {}", hex::encode(reason_cbor))
}
