//! Per-request orchestration of node sessions.
//!
//! Both orchestrators follow the same discipline: validate locally, open one
//! session, dial, race the protocol call against the session's side channel
//! and the deadline, close the session, report one outcome.

mod has_tx;
mod session;
mod submit;

#[cfg(test)]
pub(crate) mod testing;

pub use has_tx::HasTxOrchestrator;
pub use submit::{rejection_summary, SubmitOrchestrator};
