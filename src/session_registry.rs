//! Shared store of live games.
//!
//! The registry lock only ever guards the map itself. Session state lives behind a per-session
//! lock, so an agent thinking about its move never blocks registry operations for other games.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument};

use crate::game_interface::{AgentFactory, DecisionAgent, Grid, Player};

/// One in-progress game.
pub struct GameSession {
    game_id: String,
    grid: Grid,
    ended: AtomicBool,
    agent: Mutex<Box<dyn DecisionAgent>>,
}

/// Shared handle on a [`GameSession`].
pub type SessionRef = Arc<GameSession>;

impl GameSession {
    fn new(game_id: String, agent: Box<dyn DecisionAgent>) -> GameSession {
        GameSession {
            game_id,
            grid: agent.grid(),
            ended: AtomicBool::new(false),
            agent: Mutex::new(agent),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Dimensions given by the first `start` of this game.
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Exclusive access to the agent.
    ///
    /// A panic in a previous holder does not make the session unusable.
    pub fn agent(&self) -> MutexGuard<'_, Box<dyn DecisionAgent>> {
        self.agent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Readable without waiting for the agent.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    fn end(&self) {
        self.agent().end_game();
        self.ended.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("game_id", &self.game_id)
            .field("grid", &self.grid)
            .field("ended", &self.is_ended())
            .finish_non_exhaustive()
    }
}

/// Mapping from game identifier to live session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionRef>>,
    factory: Arc<dyn AgentFactory>,
}

impl SessionRegistry {
    /// New sessions get their agent from `factory`.
    pub fn new(factory: Arc<dyn AgentFactory>) -> SessionRegistry {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            factory,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionRef>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session of `game_id`, creating it for `player` if it does not exist yet.
    ///
    /// On an existing session, `player` is attached and `grid` is ignored.
    #[instrument(skip(self))]
    pub fn get_or_create(&self, game_id: &str, player: Player, grid: Grid) -> SessionRef {
        let (session, created) = {
            let mut sessions = self.sessions();
            match sessions.get(game_id) {
                Some(session) => (session.clone(), false),
                None => {
                    let agent = self.factory.new_agent(player, grid);
                    let session = Arc::new(GameSession::new(game_id.to_owned(), agent));
                    sessions.insert(game_id.to_owned(), session.clone());
                    (session, true)
                }
            }
        };

        if created {
            info!("new game");
        } else {
            debug!("attaching player to existing game");
            session.agent().attach_player(player);
        }
        session
    }

    /// Session of `game_id`, if any.
    pub fn lookup(&self, game_id: &str) -> Option<SessionRef> {
        self.sessions().get(game_id).cloned()
    }

    /// Ends the game. Unknown games are ignored.
    #[instrument(skip(self))]
    pub fn mark_ended(&self, game_id: &str) {
        match self.lookup(game_id) {
            Some(session) => {
                session.end();
                info!("game ended");
            }
            None => debug!("end of unknown game"),
        }
    }

    /// Drops every ended session and returns how many were removed.
    ///
    /// Connections still holding a [`SessionRef`] keep it alive until they release it.
    pub fn remove_ended(&self) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_ended());
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "evicted ended games");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::agent::{AgentKind, BaselineFactory};

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(BaselineFactory::new(AgentKind::FirstFree, None)))
    }

    #[test]
    fn create_then_attach() {
        let registry = registry();
        let first = registry.get_or_create("g1", Player::TWO, Grid::new(2, 2));
        let second = registry.get_or_create("g1", Player::ONE, Grid::new(9, 9));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(second.grid(), Grid::new(2, 2));
        assert_eq!(
            second.agent().owned_players(),
            BTreeSet::from([Player::ONE, Player::TWO])
        );
    }

    #[test]
    fn lookup_unknown() {
        let registry = registry();
        assert!(registry.lookup("nope").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn mark_ended_twice_and_unknown() {
        let registry = registry();
        registry.get_or_create("g1", Player::ONE, Grid::new(1, 1));
        registry.mark_ended("g1");
        registry.mark_ended("g1");
        registry.mark_ended("never-started");

        let session = registry.lookup("g1").unwrap();
        assert!(session.is_ended());
        assert!(session.agent().is_ended());
        assert_eq!(session.game_id(), "g1");
    }

    #[test]
    fn remove_ended_keeps_live_games() {
        let registry = registry();
        registry.get_or_create("done", Player::ONE, Grid::new(1, 1));
        registry.get_or_create("live", Player::ONE, Grid::new(1, 1));
        registry.mark_ended("done");

        assert_eq!(registry.remove_ended(), 1);
        assert!(registry.lookup("done").is_none());
        assert!(registry.lookup("live").is_some());
        assert_eq!(registry.remove_ended(), 0);
    }

    #[test]
    fn concurrent_starts_create_one_session() {
        let registry = Arc::new(registry());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles = (0..threads)
            .map(|i| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let player = if i % 2 == 0 { Player::ONE } else { Player::TWO };
                    barrier.wait();
                    registry.get_or_create("race", player, Grid::new(3, 3))
                })
            })
            .collect::<Vec<_>>();

        let sessions = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(registry.len(), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert_eq!(
            sessions[0].agent().owned_players(),
            BTreeSet::from([Player::ONE, Player::TWO])
        );
    }
}
