//! The single in-flight suggestion slot.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Where the suggestion command currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    /// Cancellation was requested; the request has not settled yet.
    Cancelling,
}

/// Holds the cancellation handle of the one request allowed to run.
#[derive(Debug, Default)]
pub struct Session {
    active: Mutex<Option<CancellationToken>>,
}

/// Result of trying to start a request.
pub enum Begin<'a> {
    Started(ActiveRequest<'a>),
    /// Another request is running; this is its handle.
    Busy(CancellationToken),
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check for a running request and claim the slot in one step.
    pub fn begin(&self) -> Begin<'_> {
        let mut slot = self.slot();
        if let Some(token) = slot.as_ref() {
            return Begin::Busy(token.clone());
        }

        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Begin::Started(ActiveRequest {
            session: self,
            token,
        })
    }

    pub fn state(&self) -> SessionState {
        match self.slot().as_ref() {
            None => SessionState::Idle,
            Some(token) if token.is_cancelled() => SessionState::Cancelling,
            Some(_) => SessionState::Requesting,
        }
    }
}

/// Claim on the session slot. Dropping it disposes the handle and frees the slot.
pub struct ActiveRequest<'a> {
    session: &'a Session,
    token: CancellationToken,
}

impl ActiveRequest<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for ActiveRequest<'_> {
    fn drop(&mut self) {
        *self.session.slot() = None;
    }
}
