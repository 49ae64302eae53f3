//! # Node Client
//!
//! Client side of the Ouroboros node-to-client mini-protocols, reduced to
//! what a submit gateway needs: the handshake, local transaction submission
//! and mempool membership queries through the local tx monitor.
//!
//! ## Layers
//!
//! | Module       | Responsibility                                     |
//! |--------------|----------------------------------------------------|
//! | `bearer`     | UNIX socket or TCP connection                      |
//! | `mux`        | 8-byte segment headers, splitting large messages   |
//! | `protocol`   | CBOR messages of each mini-protocol                |
//! | `client`     | I/O tasks, request/response, error side channel    |
//!
//! A [`NodeClient`] is meant to live for a single request: connect, make one
//! call, close.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bearer;
pub mod client;
pub mod error;
pub mod mux;
pub mod protocol;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bearer::NodeAddress;
pub use client::{NodeClient, SubmitResult};
pub use error::ClientError;
