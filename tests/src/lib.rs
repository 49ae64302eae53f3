//! # Submit API Test Suite
//!
//! End-to-end tests that drive the HTTP router in-process while the real
//! node client talks to a fake node over a local socket.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs          # Fake node listeners, config, request helpers
//! └── integration/
//!     ├── submit_flow.rs  # POST /api/submit/tx
//!     ├── has_tx_flow.rs  # GET /api/hastx/:tx_hash
//!     └── startup.rs      # Node check, TCP transport
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p submit-tests
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
