//! Process-level index of running games.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::driver;
use crate::game::Game;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u32);

impl GameId {
    /// Short enough for players to pass around by hand.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(0..100_000))
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lookup index behind `join` and `reconnect`. Shared by every
/// connection task; games are inserted at creation and evicted by their
/// driver once finished.
#[derive(Default)]
pub struct GameRegistry {
    games: RwLock<HashMap<GameId, Arc<Mutex<Game>>>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a game under a fresh unique id and start its driver task.
    pub async fn create(self: &Arc<Self>) -> (GameId, Arc<Mutex<Game>>) {
        let mut games = self.games.write().await;
        let mut id = GameId::random();
        while games.contains_key(&id) {
            id = GameId::random();
        }

        let game = Arc::new(Mutex::new(Game::new(id)));
        games.insert(id, Arc::clone(&game));
        driver::spawn(Arc::clone(self), id, Arc::clone(&game));
        tracing::info!(game = %id, "game created");
        (id, game)
    }

    pub async fn get(&self, id: GameId) -> Option<Arc<Mutex<Game>>> {
        self.games.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: GameId) {
        self.games.write().await.remove(&id);
    }

    pub async fn count(&self) -> usize {
        self.games.read().await.len()
    }
}
