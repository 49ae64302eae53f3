//! Mempool membership queries.

use ledger_era::TxId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::config::ConfigError;
use crate::domain::types::{HasTxOutcome, NodeTarget};
use crate::orchestrator::session::{checked_timeout, deadline_after, race, Race, SessionLease};
use crate::ports::SessionFactory;

/// Asks the node whether a transaction is in its mempool, one session per
/// query.
#[derive(Clone)]
pub struct HasTxOrchestrator {
    sessions: Arc<dyn SessionFactory>,
    target: NodeTarget,
    timeout: Duration,
}

impl HasTxOrchestrator {
    /// Fails if `timeout` is zero or too large to turn into a deadline.
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        target: NodeTarget,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            sessions,
            target,
            timeout: checked_timeout(timeout)?,
        })
    }

    /// `tx_hash` must be 64 hex characters. A malformed hash is reported
    /// without contacting the node.
    pub async fn has_tx(&self, tx_hash: &str) -> HasTxOutcome {
        let tx_id: TxId = match tx_hash.parse() {
            Ok(tx_id) => tx_id,
            Err(e) => {
                return HasTxOutcome::ValidationFailure {
                    reason: e.to_string(),
                };
            }
        };

        let deadline = deadline_after(self.timeout);
        let mut lease = SessionLease::open(self.sessions.as_ref());
        let outcome = self.query(&mut lease, &tx_id, deadline).await;
        lease.release();

        match &outcome {
            HasTxOutcome::TransportFailure { cause } => {
                warn!(
                    tx_id = %tx_id,
                    node = %self.target,
                    cause = %cause,
                    "Mempool query failed"
                );
            }
            HasTxOutcome::Timeout => {
                warn!(tx_id = %tx_id, "Mempool query timed out");
            }
            other => debug!(tx_id = %tx_id, outcome = other.label(), "Mempool queried"),
        }
        outcome
    }

    async fn query(
        &self,
        lease: &mut SessionLease,
        tx_id: &TxId,
        deadline: Instant,
    ) -> HasTxOutcome {
        if let Err(e) = lease.dial(&self.target, deadline).await {
            return HasTxOutcome::TransportFailure {
                cause: e.to_string(),
            };
        }

        let mut errors = lease.session().take_errors();
        let call = lease.session().has_tx(tx_id);

        match race(call, errors.as_mut(), deadline).await {
            Race::Completed(Ok(true)) => HasTxOutcome::Found,
            Race::Completed(Ok(false)) => HasTxOutcome::NotFound,
            Race::Completed(Err(e)) | Race::SideChannel(e) => HasTxOutcome::TransportFailure {
                cause: e.to_string(),
            },
            Race::TimedOut => HasTxOutcome::Timeout,
        }
    }
}
