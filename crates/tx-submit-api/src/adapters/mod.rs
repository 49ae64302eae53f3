//! Adapters for the submit API.
//!
//! Implementations of the outbound ports over the real era classifier and
//! node client.

pub mod classifier;
pub mod node;

pub use classifier::LedgerEraClassifier;
pub use node::NodeClientSessions;
