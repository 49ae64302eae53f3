//! Scripted sessions for orchestrator tests.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ledger_era::{Era, TxId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::types::NodeTarget;
use crate::ports::{ErrorStream, NodeSession, SessionError, SessionFactory, SubmitResponse};

/// How one session call behaves.
#[derive(Debug, Clone)]
pub(crate) enum Step<T> {
    Now(T),
    After(Duration, T),
    Fail(SessionError),
    Hang,
}

impl<T: Clone> Step<T> {
    async fn run(&self) -> Result<T, SessionError> {
        match self {
            Step::Now(value) => Ok(value.clone()),
            Step::After(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(value.clone())
            }
            Step::Fail(error) => Err(error.clone()),
            Step::Hang => futures::future::pending().await,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub dial: Step<()>,
    pub submit: Step<SubmitResponse>,
    pub has_tx: Step<bool>,
    /// Delay after `take_errors` before the side channel yields `Closed`.
    /// `None` gives a side channel that ends without an error.
    pub side_error: Option<Duration>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            dial: Step::Now(()),
            submit: Step::Now(SubmitResponse::Accepted),
            has_tx: Step::Now(true),
            side_error: None,
        }
    }
}

/// Snapshot of what the sessions were asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Calls {
    pub created: usize,
    pub dialed: usize,
    pub closed: usize,
    pub submitted: Vec<(Era, Vec<u8>)>,
    pub queried: Vec<TxId>,
}

#[derive(Clone)]
pub(crate) struct FakeSessions {
    script: Script,
    calls: Arc<Mutex<Calls>>,
}

impl FakeSessions {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    pub(crate) fn calls(&self) -> Calls {
        self.calls.lock().clone()
    }
}

impl SessionFactory for FakeSessions {
    fn create(&self) -> Box<dyn NodeSession> {
        self.calls.lock().created += 1;
        Box::new(FakeSession {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
            dialed: false,
            errors_taken: false,
        })
    }
}

struct FakeSession {
    script: Script,
    calls: Arc<Mutex<Calls>>,
    dialed: bool,
    errors_taken: bool,
}

#[async_trait]
impl NodeSession for FakeSession {
    async fn dial(&mut self, _target: &NodeTarget) -> Result<(), SessionError> {
        self.calls.lock().dialed += 1;
        self.script.dial.run().await?;
        self.dialed = true;
        Ok(())
    }

    fn take_errors(&mut self) -> Option<ErrorStream> {
        if !self.dialed || self.errors_taken {
            return None;
        }
        self.errors_taken = true;
        Some(match self.script.side_error {
            Some(delay) => {
                let at = tokio::time::Instant::now() + delay;
                stream::once(async move {
                    tokio::time::sleep_until(at).await;
                    SessionError::Closed
                })
                .boxed()
            }
            None => stream::empty().boxed(),
        })
    }

    async fn submit_tx(&mut self, era: Era, tx: &[u8]) -> Result<SubmitResponse, SessionError> {
        self.calls.lock().submitted.push((era, tx.to_vec()));
        self.script.submit.run().await
    }

    async fn has_tx(&mut self, tx_id: &TxId) -> Result<bool, SessionError> {
        self.calls.lock().queried.push(*tx_id);
        self.script.has_tx.run().await
    }

    fn close(&mut self) {
        self.calls.lock().closed += 1;
    }
}

