//! The inbound router: one session per connection.
//!
//! A session starts detached, owning its player. `create` and `join` hand
//! the player over to a game; `reconnect` adopts the identity of a player
//! already in one. Everything else routes to the game's current event.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use nightcourt_common::{Action, EngineError, EventName, Message};

use crate::game::Game;
use crate::player::{Player, PlayerId};
use crate::registry::{GameId, GameRegistry};

pub struct Session {
    registry: Arc<GameRegistry>,
    state: SessionState,
}

enum SessionState {
    /// No game yet; the session owns the player.
    Detached(Player),
    /// The player lives in the game's registry now.
    Attached {
        game: Arc<Mutex<Game>>,
        player: PlayerId,
    },
    /// Momentarily empty while a player is being handed over.
    Limbo,
}

impl Session {
    pub fn new(registry: Arc<GameRegistry>, tx: mpsc::Sender<Message>) -> Self {
        Self {
            registry,
            state: SessionState::Detached(Player::new(tx)),
        }
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        if let SessionState::Detached(player) = &mut self.state {
            player.set_addr(addr);
        }
        self
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match &self.state {
            SessionState::Detached(player) => Some(player.id()),
            SessionState::Attached { player, .. } => Some(*player),
            SessionState::Limbo => None,
        }
    }

    pub async fn on_message(&mut self, msg: Message) {
        if msg.action == Action::Reconnect {
            self.reconnect(&msg).await;
            return;
        }

        match &self.state {
            SessionState::Detached(_) => match msg.action {
                Action::Create => self.create(&msg).await,
                Action::Join => self.join(&msg).await,
                _ => {
                    tracing::warn!(action = %msg.action, "message from a player without a game");
                    self.refuse(msg.action, &EngineError::UnknownGame);
                }
            },
            SessionState::Attached { game, player } => {
                let player = *player;
                let game = Arc::clone(game);
                let mut game = game.lock().await;
                if let Err(err) = game.on_message(player, &msg) {
                    tracing::warn!(
                        game = %game.id(),
                        player = %player,
                        action = %msg.action,
                        error = %err,
                        "action rejected"
                    );
                }
            }
            SessionState::Limbo => {
                tracing::error!(action = %msg.action, "message while session is in limbo");
            }
        }
    }

    async fn create(&mut self, msg: &Message) {
        let Some(mut player) = self.take_detached() else {
            return;
        };
        player.set_master(true);
        player.set_last_received(msg.clone());

        let (id, game) = self.registry.create().await;
        let mut locked = game.lock().await;
        match locked.admit(player, msg) {
            Ok(player_id) => {
                drop(locked);
                tracing::info!(game = %id, player = %player_id, "game created by player");
                self.state = SessionState::Attached {
                    game,
                    player: player_id,
                };
            }
            Err((mut player, err)) => {
                drop(locked);
                // The empty game stays registered; its driver idles like any
                // other lobby waiting for players.
                player.set_master(false);
                tracing::warn!(game = %id, error = %err, "create rejected");
                self.state = SessionState::Detached(player);
            }
        }
    }

    async fn join(&mut self, msg: &Message) {
        let game_id = msg
            .data
            .get("game")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .map(GameId);
        let Some(game_id) = game_id else {
            self.refuse(Action::Join, &EngineError::UnknownGame);
            return;
        };
        let Some(game) = self.registry.get(game_id).await else {
            self.refuse(Action::Join, &EngineError::UnknownGame);
            return;
        };

        let Some(mut player) = self.take_detached() else {
            return;
        };
        player.set_last_received(msg.clone());

        let mut locked = game.lock().await;
        match locked.admit(player, msg) {
            Ok(player_id) => {
                drop(locked);
                tracing::info!(game = %game_id, player = %player_id, "player joined");
                self.state = SessionState::Attached {
                    game,
                    player: player_id,
                };
            }
            Err((player, err)) => {
                drop(locked);
                tracing::warn!(game = %game_id, error = %err, "join rejected");
                self.state = SessionState::Detached(player);
            }
        }
    }

    async fn reconnect(&mut self, msg: &Message) {
        if !matches!(self.state, SessionState::Detached(_)) {
            tracing::warn!("reconnect from an attached session ignored");
            return;
        }

        let ids = msg.data.get("game").and_then(Value::as_u64).zip(
            msg.data.get("player").and_then(Value::as_u64),
        );
        let parsed = ids.and_then(|(game, player)| {
            Some((
                GameId(u32::try_from(game).ok()?),
                PlayerId(u32::try_from(player).ok()?),
            ))
        });
        let Some((game_id, player_id)) = parsed else {
            self.refuse(Action::Reconnect, &EngineError::UnknownGame);
            return;
        };

        let Some(game) = self.registry.get(game_id).await else {
            tracing::warn!(game = %game_id, "reconnect to unknown game");
            self.refuse(Action::Reconnect, &EngineError::UnknownGame);
            return;
        };

        let mut locked = game.lock().await;
        if locked.is_over() {
            drop(locked);
            tracing::warn!(game = %game_id, "reconnect to a finished game");
            self.refuse(Action::Reconnect, &EngineError::GameFinished);
            return;
        }

        // Eliminated players cannot come back; only active ones count.
        if locked.players().get(player_id).is_none() {
            drop(locked);
            tracing::warn!(game = %game_id, player = %player_id, "reconnect as unknown player");
            self.refuse(Action::Reconnect, &EngineError::UnknownPlayer);
            return;
        }

        let Some(old) = locked.players_mut().remove(player_id) else {
            drop(locked);
            self.refuse(Action::Reconnect, &EngineError::UnknownPlayer);
            return;
        };
        let Some(mut fresh) = self.take_detached() else {
            locked.players_mut().add(old);
            return;
        };

        fresh.adopt(old);
        let replay = fresh.last_sent().cloned();
        let id = locked.players_mut().add(fresh);
        if let Some(replay) = replay {
            locked.players_mut().send_to(id, &replay);
        }
        drop(locked);

        tracing::info!(game = %game_id, player = %id, "player reconnected");
        self.state = SessionState::Attached { game, player: id };
    }

    fn take_detached(&mut self) -> Option<Player> {
        match std::mem::replace(&mut self.state, SessionState::Limbo) {
            SessionState::Detached(player) => Some(player),
            other => {
                self.state = other;
                None
            }
        }
    }

    fn refuse(&mut self, action: Action, err: &EngineError) {
        if let SessionState::Detached(player) = &mut self.state {
            player.send(&Message::err(EventName::Game, 0, action, err));
        }
    }
}
