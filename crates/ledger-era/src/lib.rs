//! # Ledger Era
//!
//! Decides which ledger era a serialized transaction belongs to and computes
//! its transaction id.
//!
//! ## Detection
//!
//! ```text
//!   raw bytes
//!       │
//!       ▼
//!   ┌──────────────┐   envelope, body keys, output shapes, witness keys
//!   │   inspect    │──────────────────────────────────────────────┐
//!   └──────────────┘                                              │
//!       │ body span                                               ▼
//!       ▼                                        Conway → Babbage → Alonzo
//!   blake2b-256 ──► TxId                         → Mary → Allegra → Shelley
//!                                                (first acceptor wins)
//! ```
//!
//! The body is hashed exactly as submitted; nothing is re-encoded.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod classify;
pub mod era;
pub mod error;
pub mod tx_id;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use classify::{body_bytes, classify, ClassifiedTx};
pub use era::Era;
pub use error::EraError;
pub use tx_id::{TxId, TxIdParseError, TX_ID_LEN};
