//! Session lifecycle as seen by one client
//!
//! The server is the only authority on the lifecycle. Transitions here are
//! applied in response to server topics and only ever move forward:
//! `Ready -> Running -> Over`.

use shared::{EntityId, SessionState};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
    #[error("session is not running")]
    NotRunning,
    #[error("no session yet")]
    NotSeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    local_player_id: EntityId,
    state: SessionState,
    score: u32,
}

impl Session {
    /// Creates the session from the server's connect acknowledgment.
    pub fn seed(local_player_id: EntityId, state: SessionState) -> Self {
        Self {
            local_player_id,
            state,
            score: 0,
        }
    }

    pub fn local_player_id(&self) -> &str {
        &self.local_player_id
    }

    pub fn is_local(&self, player_id: &str) -> bool {
        self.local_player_id == player_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Re-applies a state reported by the server (a repeated `init`).
    /// The lifecycle never moves backward, so an older state is ignored.
    pub fn reseed(&mut self, state: SessionState) {
        if u8::from(state) > u8::from(self.state) {
            self.state = state;
        }
    }

    /// A repeated `init` naming a different local id. The id follows the
    /// server; state and score carry over.
    pub fn rebind(&mut self, local_player_id: EntityId, state: SessionState) {
        self.local_player_id = local_player_id;
        self.reseed(state);
    }

    /// `Ready -> Running`. Already running is fine, a finished session is not.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready | SessionState::Running => {
                self.state = SessionState::Running;
                Ok(())
            }
            SessionState::Over => Err(SessionError::InvalidTransition {
                from: SessionState::Over,
                to: SessionState::Running,
            }),
        }
    }

    /// Any state may end the session, including `Ready` when the room empties.
    pub fn finish(&mut self) {
        self.state = SessionState::Over;
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn is_over(&self) -> bool {
        self.state == SessionState::Over
    }

    pub fn start_enabled(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn add_score(&mut self, points: u32) -> Result<u32, SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        self.score = self.score.saturating_add(points);
        Ok(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_ready_session() {
        let session = Session::seed("p1".to_string(), SessionState::Ready);
        assert!(session.is_local("p1"));
        assert!(!session.is_local("p2"));
        assert!(session.start_enabled());
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_forward_transitions() {
        let mut session = Session::seed("p1".to_string(), SessionState::Ready);
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert!(!session.start_enabled());

        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);

        session.finish();
        assert!(session.is_over());
        assert_eq!(
            session.start(),
            Err(SessionError::InvalidTransition {
                from: SessionState::Over,
                to: SessionState::Running,
            })
        );
        assert!(session.is_over());
    }

    #[test]
    fn test_over_straight_from_ready() {
        let mut session = Session::seed("p1".to_string(), SessionState::Ready);
        session.finish();
        assert!(session.is_over());
        assert!(!session.start_enabled());
    }

    #[test]
    fn test_reseed_never_moves_backward() {
        let mut session = Session::seed("p1".to_string(), SessionState::Running);
        session.reseed(SessionState::Ready);
        assert_eq!(session.state(), SessionState::Running);
        session.reseed(SessionState::Over);
        assert_eq!(session.state(), SessionState::Over);
    }

    #[test]
    fn test_rebind_keeps_state_and_score() {
        let mut session = Session::seed("p1".to_string(), SessionState::Running);
        session.add_score(10).unwrap();

        session.rebind("p9".to_string(), SessionState::Ready);
        assert!(session.is_local("p9"));
        assert!(!session.is_local("p1"));
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.score(), 10);
    }

    #[test]
    fn test_score_only_while_running() {
        let mut session = Session::seed("p1".to_string(), SessionState::Ready);
        assert_eq!(session.add_score(10), Err(SessionError::NotRunning));

        session.start().unwrap();
        assert_eq!(session.add_score(10), Ok(10));
        assert_eq!(session.add_score(10), Ok(20));

        session.finish();
        assert_eq!(session.add_score(10), Err(SessionError::NotRunning));
        assert_eq!(session.score(), 20);
    }
}
