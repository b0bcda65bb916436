//! Session lifecycle.
//!
//! A session moves through `Idle -> Connecting -> Connected -> Closing ->
//! Closed`, with `Failed` as the terminal state of any session that died
//! rather than shut down. State is held in a `tokio::sync::watch` channel,
//! so transitions are atomic (observers never see an in-between state) and
//! callers can await a particular state with a bounded timeout.

use tokio::sync::watch;

use crate::error::{Error, Result};

/// Lifecycle state of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, nothing provisioned yet
    Idle,
    /// Provisioning collaborators (TUN device, transport connection)
    Connecting,
    /// Both pumps running
    Connected,
    /// Tearing down after a failure or shutdown request
    Closing,
    /// Shut down cleanly (terminal)
    Closed,
    /// Died on an error (terminal)
    Failed,
}

impl SessionState {
    /// True once the session can never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    /// True while packets can still flow or start flowing.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Connected)
    }

    pub fn description(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Connecting => "Connecting",
            SessionState::Connected => "Connected",
            SessionState::Closing => "Closing",
            SessionState::Closed => "Closed",
            SessionState::Failed => "Failed",
        }
    }

    fn can_transition_to(&self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Connecting)
                | (Connecting, Connected)
                | (Connecting, Closing)
                | (Connecting, Failed)
                | (Connected, Closing)
                | (Closing, Closed)
                | (Closing, Failed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Owns and publishes the session state.
pub struct Session {
    state_tx: watch::Sender<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self { state_tx }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Idle -> Connecting. Fails if the session was already started.
    pub fn start_connecting(&self) -> Result<()> {
        self.transition(SessionState::Connecting)
            .map_err(|_| Error::AlreadyRunning)
    }

    /// Connecting -> Connected.
    pub fn mark_connected(&self) -> Result<()> {
        self.transition(SessionState::Connected)
    }

    /// Begin teardown. No-op if teardown already started.
    pub fn begin_close(&self) {
        let _ = self.transition(SessionState::Closing);
    }

    /// Closing -> Closed.
    pub fn finish_close(&self) {
        let _ = self.transition(SessionState::Closed);
    }

    /// Mark the session dead. Valid from Connecting (provisioning failed)
    /// and from Closing (teardown after a pump error).
    pub fn fail(&self) {
        let _ = self.transition(SessionState::Failed);
    }

    fn transition(&self, to: SessionState) -> Result<()> {
        let mut result = Ok(());
        // send_modify holds the channel lock, so check-and-set is atomic.
        self.state_tx.send_modify(|state| {
            if state.can_transition_to(to) {
                log::debug!("session state: {} -> {}", state, to);
                *state = to;
            } else {
                result = Err(Error::InvalidStateTransition { from: *state, to });
            }
        });
        result
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);

        session.start_connecting().unwrap();
        session.mark_connected().unwrap();
        assert!(session.state().is_active());

        session.begin_close();
        assert_eq!(session.state(), SessionState::Closing);
        session.finish_close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_double_start_rejected() {
        let session = Session::new();
        session.start_connecting().unwrap();
        assert!(matches!(
            session.start_connecting(),
            Err(Error::AlreadyRunning)
        ));
    }

    #[test]
    fn test_close_during_connecting() {
        let session = Session::new();
        session.start_connecting().unwrap();
        session.begin_close();
        assert_eq!(session.state(), SessionState::Closing);
        session.finish_close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_connect_failure_goes_failed() {
        let session = Session::new();
        session.start_connecting().unwrap();
        session.fail();
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_failed_is_terminal() {
        let session = Session::new();
        session.start_connecting().unwrap();
        session.fail();
        // No transition leaves a terminal state.
        session.begin_close();
        session.finish_close();
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.mark_connected().is_err());
    }

    #[test]
    fn test_cannot_connect_from_idle() {
        let session = Session::new();
        assert!(matches!(
            session.mark_connected(),
            Err(Error::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_watch_observes_transitions() {
        let session = Session::new();
        let mut rx = session.subscribe();

        session.start_connecting().unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Connecting);

        session.mark_connected().unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Connected);
    }
}
