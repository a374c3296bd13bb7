use crate::errors::GameError;
use crate::games::crash::CrashSession;
use crate::games::mines::MinesSession;
use crate::games::types::{GameType, SessionId};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A round that spans several calls
#[derive(Debug, Clone)]
pub enum LiveSession {
    Crash(CrashSession),
    Mines(MinesSession),
}

impl LiveSession {
    pub fn game_type(&self) -> GameType {
        match self {
            LiveSession::Crash(_) => GameType::Crash,
            LiveSession::Mines(_) => GameType::Mines,
        }
    }
}

/// Thread-safe map of live Crash and Mines sessions
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, LiveSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Register a session under a fresh id
    pub fn insert(&self, session: LiveSession) -> SessionId {
        let id = Uuid::new_v4();
        self.sessions.insert(id, session);
        id
    }

    /// Mutate a Crash session under its entry lock
    pub fn with_crash<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut CrashSession) -> R,
    ) -> Result<R, GameError> {
        match self.sessions.get_mut(&id).as_deref_mut() {
            Some(LiveSession::Crash(session)) => Ok(f(session)),
            _ => Err(GameError::UnknownSession(id.to_string())),
        }
    }

    /// Mutate a Mines session under its entry lock
    pub fn with_mines<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut MinesSession) -> R,
    ) -> Result<R, GameError> {
        match self.sessions.get_mut(&id).as_deref_mut() {
            Some(LiveSession::Mines(session)) => Ok(f(session)),
            _ => Err(GameError::UnknownSession(id.to_string())),
        }
    }

    /// Snapshot of a session
    pub fn get(&self, id: SessionId) -> Option<LiveSession> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Remove a finished session
    pub fn remove(&self, id: SessionId) -> Option<LiveSession> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrashConfig, MinesConfig};
    use crate::games::crash::Tick;

    #[test]
    fn test_insert_and_mutate() {
        let registry = SessionRegistry::new();
        let id = registry.insert(LiveSession::Crash(CrashSession::with_crash_point(
            30.0,
            3.0,
            &CrashConfig::default(),
        )));

        assert_eq!(registry.count(), 1);
        let tick = registry.with_crash(id, |s| s.tick()).unwrap();
        assert!(matches!(tick, Tick::Rose(_)));

        match registry.get(id) {
            Some(LiveSession::Crash(s)) => assert!((s.multiplier() - 1.1).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind_is_unknown() {
        let registry = SessionRegistry::new();
        let mines = MinesSession::with_mines(10.0, &[0], &MinesConfig::default()).unwrap();
        let id = registry.insert(LiveSession::Mines(mines));

        assert!(matches!(
            registry.with_crash(id, |s| s.tick()),
            Err(GameError::UnknownSession(_))
        ));
        assert_eq!(registry.get(id).map(|s| s.game_type()), Some(GameType::Mines));
    }

    #[test]
    fn test_remove() {
        let registry = SessionRegistry::default();
        let mines = MinesSession::with_mines(10.0, &[0], &MinesConfig::default()).unwrap();
        let id = registry.insert(LiveSession::Mines(mines));

        assert!(registry.remove(id).is_some());
        assert!(registry.get(id).is_none());
        assert_eq!(registry.count(), 0);
        assert!(registry.remove(id).is_none());
        assert!(registry.with_mines(id, |s| s.multiplier()).is_err());
    }
}
