//! The terminal phase: announce the winning side to the whole table,
//! eliminated players included.

use serde_json::json;

use nightcourt_common::{Action, EngineError, EventName, Message, Role};

use crate::event::{Event, EventCore};
use crate::mixins::AcceptState;
use crate::player::{PlayerId, Players};
use crate::schedule::EventHistory;

pub struct GameOverEvent {
    core: EventCore,
    accept: AcceptState,
    winner: Role,
}

impl GameOverEvent {
    pub fn new(iteration: u32, winner: Role) -> Self {
        Self {
            core: EventCore::new(EventName::GameOver, iteration),
            accept: AcceptState::default(),
            winner,
        }
    }
}

impl Event for GameOverEvent {
    fn core(&self) -> &EventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EventCore {
        &mut self.core
    }

    fn process(
        &mut self,
        players: &mut Players,
        _history: &EventHistory,
    ) -> Result<(), EngineError> {
        self.core.begin();

        let msg = self.core.ok(Action::Over).with_data(json!(self.winner));
        players.broadcast_with_out(&msg);
        Ok(())
    }

    fn action(
        &mut self,
        action: Action,
        players: &mut Players,
        _history: &EventHistory,
        player: PlayerId,
        _msg: &Message,
    ) -> Result<(), EngineError> {
        if action != Action::Accept {
            return Err(EngineError::UnknownAction {
                event: self.core.name(),
                action,
            });
        }

        self.accept.record(player);
        if self.accept.is_all_accepted(&players.ids_with_out()) {
            self.core.finish();
        }
        Ok(())
    }
}
