//! Session lifetime and the completion race shared by both orchestrators.
//!
//! A request's session lives in a [`SessionLease`]. The lease closes the
//! session exactly once: explicitly through [`SessionLease::release`], or on
//! drop when the request future is cancelled part way through.

use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use crate::domain::config::ConfigError;
use crate::domain::types::NodeTarget;
use crate::ports::{ErrorStream, NodeSession, SessionError, SessionFactory};

/// Exclusive ownership of one request's session.
pub(crate) struct SessionLease {
    session: Box<dyn NodeSession>,
    released: bool,
}

impl SessionLease {
    pub(crate) fn open(factory: &dyn SessionFactory) -> Self {
        Self {
            session: factory.create(),
            released: false,
        }
    }

    pub(crate) fn session(&mut self) -> &mut dyn NodeSession {
        self.session.as_mut()
    }

    /// Dials `target`, bounded by `deadline`. Running out of time here is a
    /// dial failure: the node has not seen the request yet.
    pub(crate) async fn dial(
        &mut self,
        target: &NodeTarget,
        deadline: Instant,
    ) -> Result<(), SessionError> {
        match tokio::time::timeout_at(deadline, self.session.dial(target)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Dial(format!(
                "timed out connecting to {} socket {}",
                target.transport(),
                target
            ))),
        }
    }

    /// Closes the session.
    pub(crate) fn release(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.released {
            self.released = true;
            self.session.close();
            trace!("Node session released");
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// Which signal settled a request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Race<T> {
    /// The protocol call returned.
    Completed(T),
    /// The session reported a failure out of band.
    SideChannel(SessionError),
    /// The deadline passed first.
    TimedOut,
}

/// Waits for the first of `call`, the next side channel error, or
/// `deadline`. When several are ready at once the call wins, then the side
/// channel. The losers are dropped on return.
///
/// A side channel that ends without an error stops competing.
pub(crate) async fn race<F, T>(
    call: F,
    errors: Option<&mut ErrorStream>,
    deadline: Instant,
) -> Race<T>
where
    F: Future<Output = T>,
{
    let side_channel = async {
        match errors {
            Some(errors) => errors.next().await,
            None => None,
        }
    };

    tokio::select! {
        biased;
        result = call => Race::Completed(result),
        Some(error) = side_channel => Race::SideChannel(error),
        () = tokio::time::sleep_until(deadline) => Race::TimedOut,
    }
}

/// Accepts a request timeout only if it is positive and the clock can
/// represent a deadline that far ahead.
pub(crate) fn checked_timeout(timeout: Duration) -> Result<Duration, ConfigError> {
    if timeout.is_zero() {
        return Err(ConfigError::InvalidTimeout(
            "timeout must be positive, got 0s".into(),
        ));
    }
    if Instant::now().checked_add(timeout).is_none() {
        return Err(ConfigError::InvalidTimeout(format!(
            "given timeout too large: {}s",
            timeout.as_secs()
        )));
    }
    Ok(timeout)
}

/// `timeout` from now. `timeout` has passed [`checked_timeout`].
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout
}
