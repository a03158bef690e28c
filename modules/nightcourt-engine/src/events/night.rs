//! The night phases: the mafia's ballot, the special roles' choices, and
//! the derived outcome at dawn.

use serde_json::json;

use nightcourt_common::{Action, EngineError, EventName, Message, Role};

use crate::event::{reject, Event, EventCore};
use crate::mixins::{AcceptState, ChoiceState, VoteState};
use crate::player::{roster, Player, PlayerId, Players};
use crate::schedule::EventHistory;

use super::{require_role, target_from};

/// The mafia pick tonight's victim. Completes once every active mafia has
/// voted; a tie or an empty ballot voids the night.
pub struct MafiaEvent {
    core: EventCore,
    vote: VoteState,
}

impl MafiaEvent {
    pub fn new(iteration: u32) -> Self {
        Self {
            core: EventCore::new(EventName::Mafia, iteration),
            vote: VoteState::default(),
        }
    }
}

impl Event for MafiaEvent {
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

        let prey = roster(players.active().filter(|p| p.role() != Some(Role::Mafia)));
        let msg = self.core.ok(Action::Players).with_data(prey);
        players.send_to_role(Role::Mafia, &msg);
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

        if let Err(err) = require_role(players, player, Role::Mafia) {
            reject(&self.core, players, player, Action::Vote, &err);
            return Err(err);
        }

        let target = match target_from(players, msg) {
            Ok(target) => target,
            Err(err) => {
                reject(&self.core, players, player, Action::Vote, &err);
                return Err(err);
            }
        };

        self.vote.record(player, target);
        if !self.vote.is_all_voted(&players.ids_by_role(Role::Mafia)) {
            return Ok(());
        }

        let tally = self.vote.tally();
        self.core.finish();
        match tally {
            Some(candidate) => {
                self.vote.set_candidate(candidate);
                Ok(())
            }
            None => Err(EngineError::Inconsistent(
                "night ballot had no unique winner".into(),
            )),
        }
    }

    fn as_vote(&self) -> Option<&VoteState> {
        Some(&self.vote)
    }
}

/// A single role-holder's night choice. Covers the doctor, the girl and the
/// sheriff; the differences are the roster they see and whether picking the
/// same target twice in a row is refused.
pub struct RoleChoiceEvent {
    core: EventCore,
    choice: ChoiceState,
    role: Role,
    forbid_repeat: bool,
    hide_peers: bool,
}

impl RoleChoiceEvent {
    pub fn doctor(iteration: u32) -> Self {
        Self::new(EventName::Doctor, iteration, Role::Doctor, true, false)
    }

    pub fn girl(iteration: u32) -> Self {
        Self::new(EventName::Girl, iteration, Role::Girl, true, false)
    }

    pub fn sheriff(iteration: u32) -> Self {
        Self::new(EventName::Sheriff, iteration, Role::Sheriff, false, true)
    }

    fn new(
        name: EventName,
        iteration: u32,
        role: Role,
        forbid_repeat: bool,
        hide_peers: bool,
    ) -> Self {
        Self {
            core: EventCore::new(name, iteration),
            choice: ChoiceState::default(),
            role,
            forbid_repeat,
            hide_peers,
        }
    }
}

impl Event for RoleChoiceEvent {
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

        let Some(holder) = players.one_by_role(self.role).map(Player::id) else {
            self.core.finish();
            return Err(EngineError::RoleAbsent(self.role));
        };

        let list = if self.hide_peers {
            roster(players.active().filter(|p| p.role() != Some(self.role)))
        } else {
            roster(players.active())
        };
        let msg = self.core.ok(Action::Players).with_data(list);
        players.send_to(holder, &msg);
        Ok(())
    }

    fn action(
        &mut self,
        action: Action,
        players: &mut Players,
        history: &EventHistory,
        player: PlayerId,
        msg: &Message,
    ) -> Result<(), EngineError> {
        if action != Action::Choice {
            return Err(EngineError::UnknownAction {
                event: self.core.name(),
                action,
            });
        }

        if let Err(err) = require_role(players, player, self.role) {
            reject(&self.core, players, player, Action::Choice, &err);
            return Err(err);
        }

        let target = match target_from(players, msg) {
            Ok(target) => target,
            Err(err) => {
                reject(&self.core, players, player, Action::Choice, &err);
                return Err(err);
            }
        };

        if self.forbid_repeat {
            let previous = history
                .find_choice(self.core.name(), self.core.iteration().saturating_sub(1))
                .and_then(ChoiceState::get);
            if previous == Some(target) {
                let err = EngineError::RepeatedTarget;
                reject(&self.core, players, player, Action::Choice, &err);
                return Err(err);
            }
        }

        self.choice.set(target);
        self.core.finish();
        Ok(())
    }

    fn as_choice(&self) -> Option<&ChoiceState> {
        Some(&self.choice)
    }
}

/// Privately reveals the inspected player's role to the sheriff.
pub struct SheriffResultEvent {
    core: EventCore,
}

impl SheriffResultEvent {
    pub fn new(iteration: u32) -> Self {
        Self {
            core: EventCore::new(EventName::SheriffResult, iteration),
        }
    }
}

impl Event for SheriffResultEvent {
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

        let inspected = history
            .find_choice(EventName::Sheriff, self.core.iteration())
            .and_then(ChoiceState::get);
        let Some(target) = inspected else {
            self.core.finish();
            return Err(EngineError::Inconsistent(
                "sheriff made no inspection".into(),
            ));
        };

        let Some((username, role)) = players
            .get(target)
            .and_then(|p| p.role().map(|role| (p.name().to_string(), role)))
        else {
            self.core.finish();
            return Err(EngineError::Inconsistent(
                "inspected player is gone".into(),
            ));
        };

        let Some(sheriff) = players.one_by_role(Role::Sheriff).map(Player::id) else {
            self.core.finish();
            return Err(EngineError::RoleAbsent(Role::Sheriff));
        };

        let msg = self
            .core
            .ok(Action::Role)
            .with_data(json!({"username": username, "role": role}));
        players.send_to(sheriff, &msg);
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

        if let Err(err) = require_role(players, player, Role::Sheriff) {
            reject(&self.core, players, player, Action::Accept, &err);
            return Err(err);
        }

        self.core.finish();
        Ok(())
    }
}

/// Dawn: derive the kill from the mafia's ballot and the overlapping saves,
/// broadcast the outcome, and wait for everyone to see it.
pub struct NightResultEvent {
    core: EventCore,
    accept: AcceptState,
}

impl NightResultEvent {
    pub fn new(iteration: u32) -> Self {
        Self {
            core: EventCore::new(EventName::NightResult, iteration),
            accept: AcceptState::default(),
        }
    }
}

impl Event for NightResultEvent {
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

        // No night has happened before the first day.
        if self.core.iteration() == 1 {
            self.core.finish();
            return Ok(());
        }

        let iteration = self.core.iteration();
        let candidate = history
            .find_vote(EventName::Mafia, iteration)
            .and_then(VoteState::candidate);
        let doctor = history
            .find_choice(EventName::Doctor, iteration)
            .and_then(ChoiceState::get);
        let girl = history
            .find_choice(EventName::Girl, iteration)
            .and_then(ChoiceState::get);

        let Some(candidate) = candidate else {
            players.broadcast_active(&self.core.ok(Action::Out));
            return Err(EngineError::Inconsistent("mafia has no candidate".into()));
        };

        if girl == Some(candidate) || doctor == Some(candidate) {
            tracing::debug!(iteration, target = %candidate, "night kill prevented");
            players.broadcast_active(&self.core.ok(Action::Out));
            return Ok(());
        }

        let username = players
            .get(candidate)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let msg = self
            .core
            .ok(Action::Out)
            .with_data(json!({"id": candidate, "username": username}));
        players.broadcast_active(&msg);
        if let Some(victim) = players.get_mut(candidate) {
            victim.set_out(true);
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
