//! The public day trial: everyone votes, the unique plurality is banished.

use serde_json::json;

use nightcourt_common::{Action, EngineError, EventName, Message};

use crate::event::{reject, Event, EventCore};
use crate::mixins::{AcceptState, VoteState};
use crate::player::{roster, PlayerId, Players};
use crate::schedule::EventHistory;

use super::target_from;

/// Collects one vote from every active player. Each vote is echoed to the
/// whole table by name.
pub struct CourtEvent {
    core: EventCore,
    vote: VoteState,
}

impl CourtEvent {
    pub fn new(iteration: u32) -> Self {
        Self {
            core: EventCore::new(EventName::Court, iteration),
            vote: VoteState::default(),
        }
    }
}

impl Event for CourtEvent {
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

        let accused = roster(players.active());
        let msg = self.core.ok(Action::Players).with_data(accused);
        players.broadcast_active(&msg);
        Ok(())
    }

    fn action(
        &mut self,
        action: Action,
        players: &mut Players,
        _history: &EventHistory,
        player: PlayerId,
        msg: &Message,
    ) -> Result<(), EngineError> {
        if action != Action::Vote {
            return Err(EngineError::UnknownAction {
                event: self.core.name(),
                action,
            });
        }

        let target = match target_from(players, msg) {
            Ok(target) => target,
            Err(err) => {
                reject(&self.core, players, player, Action::Vote, &err);
                return Err(err);
            }
        };

        let voter_name = players
            .get_with_out(player)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let target_name = players
            .get(target)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let echo = self
            .core
            .ok(Action::Vote)
            .with_data(json!({"player": voter_name, "vote": target_name}));
        players.broadcast_active(&echo);

        self.vote.record(player, target);
        if self.vote.is_all_voted(&players.ids_active()) {
            self.core.finish();
        }
        Ok(())
    }

    fn as_vote(&self) -> Option<&VoteState> {
        Some(&self.vote)
    }
}

/// Resolves the trial: tallies the recorded court ballot, banishes the
/// unique plurality winner (or nobody on a tie), and waits for everyone to
/// acknowledge the verdict.
pub struct CourtResultEvent {
    core: EventCore,
    accept: AcceptState,
}

impl CourtResultEvent {
    pub fn new(iteration: u32) -> Self {
        Self {
            core: EventCore::new(EventName::CourtResult, iteration),
            accept: AcceptState::default(),
        }
    }
}

impl Event for CourtResultEvent {
    fn core(&self) -> &EventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EventCore {
        &mut self.core
    }

    fn process(
        &mut self,
        players: &mut Players,
        history: &EventHistory,
    ) -> Result<(), EngineError> {
        self.core.begin();

        let Some(ballot) = history.find_vote(EventName::Court, self.core.iteration()) else {
            self.core.finish();
            return Err(EngineError::Inconsistent("no court ballot in history".into()));
        };

        let Some(target) = ballot.tally() else {
            players.broadcast_active(&self.core.ok(Action::Out));
            return Err(EngineError::Inconsistent(
                "court ballot had no unique winner".into(),
            ));
        };

        let username = players
            .get(target)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let verdict = self
            .core
            .ok(Action::Out)
            .with_data(json!({"id": target, "username": username}));
        players.broadcast_active(&verdict);
        if let Some(banished) = players.get_mut(target) {
            banished.set_out(true);
        }
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
        if self.accept.is_all_accepted(&players.ids_active()) {
            self.core.finish();
        }
        Ok(())
    }
}
