//! Port definitions (hexagonal seams).

pub mod outbound;

pub use outbound::{
    EraClassifier, ErrorStream, NodeSession, SessionError, SessionFactory, SubmitResponse,
};
