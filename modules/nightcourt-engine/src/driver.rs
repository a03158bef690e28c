//! The per-game driver task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use nightcourt_common::EventName;

use crate::event::EventStatus;
use crate::game::Game;
use crate::registry::{GameId, GameRegistry};

/// Poll cadence for current-event transitions.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Drive one game: tick it until the terminal event has been acknowledged
/// by everyone, then evict the game from the registry.
pub fn spawn(
    registry: Arc<GameRegistry>,
    id: GameId,
    game: Arc<Mutex<Game>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let mut game = game.lock().await;
            game.tick();

            let finished = game.current().name() == EventName::GameOver
                && game.current().status() == EventStatus::Done;
            if finished {
                drop(game);
                registry.remove(id).await;
                tracing::info!(game = %id, "game finished");
                break;
            }
        }
    })
}
