//! Request outcomes and the node target.

use ledger_era::TxId;
use std::fmt;
use std::path::PathBuf;

/// Where the node listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTarget {
    /// Local UNIX domain socket
    Unix(PathBuf),
    /// Remote TCP endpoint, usually a socat bridge in front of the socket
    Tcp { host: String, port: u16 },
}

impl NodeTarget {
    pub fn transport(&self) -> &'static str {
        match self {
            NodeTarget::Unix(_) => "unix",
            NodeTarget::Tcp { .. } => "tcp",
        }
    }
}

impl fmt::Display for NodeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTarget::Unix(path) => write!(f, "{}", path.display()),
            NodeTarget::Tcp { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// Terminal result of one submission. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The node put the transaction in its mempool.
    Accepted { tx_id: TxId },

    /// The node refused the transaction. `reason_cbor` is the node's raw
    /// rejection reason; `reason` is a printable summary of it.
    Rejected { reason_cbor: Vec<u8>, reason: String },

    /// The node could not be reached or the connection failed mid-exchange.
    TransportFailure { cause: String },

    /// The bytes do not parse as a transaction of any known era.
    ClassificationFailure { reason: String },

    /// The request was malformed before any classification.
    ValidationFailure { reason: String },

    /// No answer within the configured timeout.
    Timeout,
}

impl SubmissionOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Accepted { .. } => "accepted",
            SubmissionOutcome::Rejected { .. } => "rejected",
            SubmissionOutcome::TransportFailure { .. } => "transport_failure",
            SubmissionOutcome::ClassificationFailure { .. } => "classification_failure",
            SubmissionOutcome::ValidationFailure { .. } => "validation_failure",
            SubmissionOutcome::Timeout => "timeout",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }
}

/// Terminal result of one mempool membership query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HasTxOutcome {
    Found,
    NotFound,
    TransportFailure { cause: String },
    Timeout,
    /// The transaction hash is not 64 hex characters.
    ValidationFailure { reason: String },
}

impl HasTxOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            HasTxOutcome::Found => "found",
            HasTxOutcome::NotFound => "not_found",
            HasTxOutcome::TransportFailure { .. } => "transport_failure",
            HasTxOutcome::Timeout => "timeout",
            HasTxOutcome::ValidationFailure { .. } => "validation_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        let unix = NodeTarget::Unix(PathBuf::from("/node-ipc/node.socket"));
        assert_eq!(unix.to_string(), "/node-ipc/node.socket");
        assert_eq!(unix.transport(), "unix");

        let tcp = NodeTarget::Tcp {
            host: "relay".into(),
            port: 3001,
        };
        assert_eq!(tcp.to_string(), "relay:3001");
        assert_eq!(tcp.transport(), "tcp");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SubmissionOutcome::Timeout.label(), "timeout");
        assert!(SubmissionOutcome::Accepted {
            tx_id: TxId::new([0; 32])
        }
        .is_accepted());
        assert_eq!(HasTxOutcome::NotFound.label(), "not_found");
    }
}
