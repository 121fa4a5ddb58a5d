//! Session and conversation identifiers for the caller-facing surfaces.
//! The orchestrator treats conversation ids as opaque strings.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Sessions idle longer than this are considered stale
const SESSION_TTL_HOURS: i64 = 24;

/// `session_` followed by 16 hex characters
pub fn new_session_id() -> String {
    format!("session_{}", &uuid::Uuid::new_v4().simple().to_string()[..16])
}

/// `conv_` followed by 12 hex characters
pub fn new_conversation_id() -> String {
    format!("conv_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// One interactive chat session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub conversation_id: String,
    pub started_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub turns: u32,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: new_session_id(),
            conversation_id: new_conversation_id(),
            started_at: now,
            last_active: now,
            turns: 0,
        }
    }

    /// Count a completed question/answer turn
    pub fn touch(&mut self) {
        self.turns += 1;
        self.last_active = Utc::now();
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.last_active > Duration::hours(SESSION_TTL_HOURS)
    }

    /// Start a fresh conversation inside the same session
    pub fn reset_conversation(&mut self) {
        self.conversation_id = new_conversation_id();
        self.turns = 0;
    }

    /// Reset the conversation when the session has been idle past its TTL.
    /// Returns whether a reset happened.
    pub fn refresh_if_stale(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_stale(now) {
            return false;
        }
        self.reset_conversation();
        self.last_active = now;
        true
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
    fn test_id_shapes() {
        let s = new_session_id();
        assert!(s.starts_with("session_"));
        assert_eq!(s.len(), "session_".len() + 16);
        assert!(s["session_".len()..].chars().all(|c| c.is_ascii_hexdigit()));

        let c = new_conversation_id();
        assert!(c.starts_with("conv_"));
        assert_eq!(c.len(), "conv_".len() + 12);
        assert_ne!(c, new_conversation_id());
    }

    #[test]
    fn test_staleness() {
        let mut session = Session::new();
        assert!(!session.is_stale(Utc::now()));
        assert!(session.is_stale(Utc::now() + Duration::hours(25)));
        session.touch();
        assert_eq!(session.turns, 1);
    }

    #[test]
    fn test_stale_session_gets_new_conversation() {
        let mut session = Session::new();
        session.touch();
        let before = session.conversation_id.clone();

        assert!(!session.refresh_if_stale(Utc::now() + Duration::hours(1)));
        assert_eq!(session.conversation_id, before);

        let later = Utc::now() + Duration::hours(SESSION_TTL_HOURS + 1);
        assert!(session.refresh_if_stale(later));
        assert_ne!(session.conversation_id, before);
        assert_eq!(session.turns, 0);
        assert!(!session.is_stale(later));
    }

    #[test]
    fn test_reset_conversation_keeps_session() {
        let mut session = Session::new();
        let before = session.conversation_id.clone();
        session.touch();
        session.reset_conversation();
        assert_ne!(session.conversation_id, before);
        assert_eq!(session.turns, 0);
        assert!(session.session_id.starts_with("session_"));
    }
}
