//! The pre-game lobby phase: players gather until the master starts.

use serde_json::{json, Value};

use nightcourt_common::{Action, EngineError, EventName, Message};

use crate::event::{reject, Event, EventCore};
use crate::player::{roster, Player, PlayerId, Players};
use crate::registry::GameId;
use crate::schedule::EventHistory;

/// Minimum participants before the master may start.
const MIN_PLAYERS: usize = 3;

pub struct GameEvent {
    core: EventCore,
    game_id: GameId,
}

impl GameEvent {
    pub fn new(game_id: GameId) -> Self {
        Self {
            core: EventCore::new(EventName::Game, 1),
            game_id,
        }
    }

    fn broadcast_roster(&self, players: &mut Players) {
        let msg = self
            .core
            .ok(Action::Players)
            .with_data(roster(players.active()));
        players.broadcast_active(&msg);
    }

    fn username(msg: &Message) -> Result<&str, EngineError> {
        msg.data
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or(EngineError::InvalidUsername)
    }

    fn start(
        &mut self,
        players: &mut Players,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        let is_master = players
            .get_with_out(player)
            .map(Player::master)
            .unwrap_or(false);
        if !is_master {
            let err = EngineError::NotMaster;
            reject(&self.core, players, player, Action::Start, &err);
            return Err(err);
        }

        if players.len_active() < MIN_PLAYERS {
            let err = EngineError::TooFewPlayers;
            reject(&self.core, players, player, Action::Start, &err);
            return Err(err);
        }

        self.core.finish();
        Ok(())
    }

    fn rename(
        &mut self,
        action: Action,
        players: &mut Players,
        player: PlayerId,
        msg: &Message,
    ) -> Result<(), EngineError> {
        let username = match Self::username(msg) {
            Ok(name) => name.to_string(),
            Err(err) => {
                reject(&self.core, players, player, action, &err);
                return Err(err);
            }
        };

        if let Some(existing) = players.by_name(&username) {
            if existing.id() != player {
                let err = EngineError::UsernameTaken;
                reject(&self.core, players, player, action, &err);
                return Err(err);
            }
        }

        if let Some(p) = players.get_with_out_mut(player) {
            p.set_name(&username);
        }
        let reply = self.core.ok(action).with_data(
            json!({"username": username, "id": player, "game": self.game_id}),
        );
        players.send_to(player, &reply);
        self.broadcast_roster(players);
        Ok(())
    }
}

impl Event for GameEvent {
    fn core(&self) -> &EventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EventCore {
        &mut self.core
    }

    fn action(
        &mut self,
        action: Action,
        players: &mut Players,
        _history: &EventHistory,
        player: PlayerId,
        msg: &Message,
    ) -> Result<(), EngineError> {
        match action {
            Action::Start => self.start(players, player),
            // A player already in the lobby re-sending create/join just
            // renames itself; admission happens through `admit`.
            Action::Create | Action::Join => self.rename(action, players, player, msg),
            other => Err(EngineError::UnknownAction {
                event: self.core.name(),
                action: other,
            }),
        }
    }

    fn admit(
        &mut self,
        players: &mut Players,
        mut player: Player,
        msg: &Message,
    ) -> Result<PlayerId, (Player, EngineError)> {
        let action = msg.action;
        let username = match Self::username(msg) {
            Ok(name) => name.to_string(),
            Err(err) => {
                player.send(&self.core.err(action, &err));
                return Err((player, err));
            }
        };

        if players.by_name(&username).is_some() {
            let err = EngineError::UsernameTaken;
            player.send(&self.core.err(action, &err));
            return Err((player, err));
        }

        player.set_name(&username);
        let id = players.add(player);

        let reply = self
            .core
            .ok(action)
            .with_data(json!({"username": username, "id": id, "game": self.game_id}));
        players.send_to(id, &reply);
        self.broadcast_roster(players);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStatus;
    use tokio::sync::mpsc;

    fn lobby() -> (GameEvent, Players) {
        (GameEvent::new(GameId(7)), Players::new())
    }

    fn joiner(name: &str) -> (Player, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(16);
        let mut p = Player::new(tx);
        p.set_name(name);
        (p, rx)
    }

    fn join_msg(name: &str) -> Message {
        Message {
            status: None,
            iteration: 0,
            event: EventName::Game,
            action: Action::Join,
            data: json!({"username": name}),
        }
    }

    #[test]
    fn admit_rejects_duplicate_usernames() {
        let (mut event, mut players) = lobby();
        let (anton, _rx) = joiner("anton");
        players.add(anton);

        let (dup, mut rx) = joiner("");
        let err = event.admit(&mut players, dup, &join_msg("anton"));
        assert!(matches!(err, Err((_, EngineError::UsernameTaken))));
        assert_eq!(players.len_active(), 1);
        assert!(rx.try_recv().unwrap().is_err());
    }

    #[test]
    fn admit_names_registers_and_replies() {
        let (mut event, mut players) = lobby();
        let (fresh, mut rx) = joiner("");
        let id = event
            .admit(&mut players, fresh, &join_msg("anton"))
            .unwrap();

        assert_eq!(players.get(id).unwrap().name(), "anton");

        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.action, Action::Join);
        assert_eq!(reply.data["username"], "anton");
        assert_eq!(reply.data["game"], 7);

        let broadcast = rx.try_recv().unwrap();
        assert_eq!(broadcast.action, Action::Players);
        assert_eq!(broadcast.data.as_array().unwrap().len(), 1);
    }

    #[test]
    fn start_requires_master_and_quorum() {
        let (mut event, mut players) = lobby();
        let (mut master, _mrx) = joiner("m");
        master.set_master(true);
        let master_id = players.add(master);
        let (pleb, _prx) = joiner("p");
        let pleb_id = players.add(pleb);

        let start = Message {
            status: None,
            iteration: 0,
            event: EventName::Game,
            action: Action::Start,
            data: Value::Null,
        };

        let history = EventHistory::new();
        assert_eq!(
            event.action(Action::Start, &mut players, &history, pleb_id, &start),
            Err(EngineError::NotMaster)
        );
        assert_eq!(
            event.action(Action::Start, &mut players, &history, master_id, &start),
            Err(EngineError::TooFewPlayers)
        );
        assert_eq!(event.status(), EventStatus::Pending);

        let (third, _trx) = joiner("t");
        players.add(third);
        event
            .action(Action::Start, &mut players, &history, master_id, &start)
            .unwrap();
        assert_eq!(event.status(), EventStatus::Done);
    }
}
