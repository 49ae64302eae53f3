//! Cross-crate flows.

#[cfg(all(test, unix))]
mod has_tx_flow;
#[cfg(test)]
mod startup;
#[cfg(all(test, unix))]
mod submit_flow;
