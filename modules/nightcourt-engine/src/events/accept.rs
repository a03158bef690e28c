//! The generic synchronization barrier bracketing substantive phases.

use nightcourt_common::{Action, EngineError, EventName, Message};

use crate::event::{Event, EventCore};
use crate::mixins::AcceptState;
use crate::player::{PlayerId, Players};
use crate::schedule::EventHistory;

/// Waits until every active player has acknowledged with the configured
/// action (`start` or `end` for phase brackets).
pub struct AcceptEvent {
    core: EventCore,
    accept: AcceptState,
    action: Action,
}

impl AcceptEvent {
    pub fn new(iteration: u32, name: EventName, action: Action) -> Self {
        Self {
            core: EventCore::new(name, iteration),
            accept: AcceptState::default(),
            action,
        }
    }
}

impl Event for AcceptEvent {
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
        let msg = self.core.ok(self.action);
        players.broadcast_active(&msg);
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
        if action != self.action {
            return Err(EngineError::UnknownAction {
                event: self.core.name(),
                action,
            });
        }

        self.accept.record(player);
        if self.accept.is_all_accepted(&players.ids_active()) {
            self.core.finish();
        }
        Ok(())
    }
}
