//! # Transaction Submit API
//!
//! HTTP gateway in front of a local Cardano node. Clients post signed
//! transactions as CBOR; the gateway detects the ledger era, relays the
//! transaction over the node-to-client mini-protocols and reports the node's
//! verdict. It can also ask the node whether a transaction is still in its
//! mempool.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      tx-submit-api                           │
//! │                                                              │
//! │   HTTP :8090                         Metrics :8081           │
//! │   POST /api/submit/tx                GET /                   │
//! │   GET  /api/hastx/:tx_hash                                   │
//! │   GET  /healthcheck                                          │
//! │        │                                                     │
//! │   ┌────┴──────────────────────────────────────────┐          │
//! │   │ CatchPanic → CORS → AccessLog → Metrics → Limit │        │
//! │   └────┬──────────────────────────────────────────┘          │
//! │        │                                                     │
//! │   ┌────┴───────────────┐    ┌───────────────────┐            │
//! │   │ SubmitOrchestrator │    │ HasTxOrchestrator │            │
//! │   └────┬───────────────┘    └────┬──────────────┘            │
//! │        │ EraClassifier           │                           │
//! │        │ SessionFactory ─────────┘                           │
//! └────────┼─────────────────────────────────────────────────────┘
//!          │ one session per request
//!          ▼
//!     cardano-node (UNIX socket or TCP)
//! ```
//!
//! ## Modules
//!
//! - [`domain`]: configuration, outcomes, HTTP error type
//! - [`ports`]: seams towards the era classifier and node sessions
//! - [`orchestrator`]: per-request session lifetime and outcome race
//! - [`adapters`]: `ledger-era` and `node-client` behind the ports
//! - [`middleware`]: CORS, access log, HTTP metrics
//! - [`service`]: routes, listeners, shutdown

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod orchestrator;
pub mod ports;
pub mod service;

pub use adapters::{LedgerEraClassifier, NodeClientSessions};
pub use domain::{
    ApiError, Config, ConfigError, GatewayError, HasTxOutcome, NodeTarget, SubmissionOutcome,
};
pub use orchestrator::{HasTxOrchestrator, SubmitOrchestrator};
pub use service::{check_node, shutdown_signal, SubmitApiService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
