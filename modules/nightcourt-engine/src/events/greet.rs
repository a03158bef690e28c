//! Role assignment and the mafia's private introduction.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;

use nightcourt_common::{Action, EngineError, EventName, Message, Role};

use crate::event::{Event, EventCore};
use crate::mixins::AcceptState;
use crate::player::{roster, PlayerId, Players};
use crate::schedule::EventHistory;

/// The role deck for a given player count.
///
/// | players | mafia | doctor | girl | sheriff | citizens      |
/// |---------|-------|--------|------|---------|---------------|
/// | 3       | 1     | 1      | 0    | 0       | 1             |
/// | 4       | 1     | 1      | 1    | 0       | 1             |
/// | >=5     | n/3   | 1      | 1    | 1       | the remainder |
fn role_deck(count: usize) -> Vec<Role> {
    let (mafia, doctor, girl, sheriff) = match count {
        0..=2 => (0, 0, 0, 0),
        3 => (1, 1, 0, 0),
        4 => (1, 1, 1, 0),
        n => (n / 3, 1, 1, 1),
    };
    let citizens = count.saturating_sub(mafia + doctor + girl + sheriff);

    let mut deck = Vec::with_capacity(count);
    deck.extend(std::iter::repeat(Role::Mafia).take(mafia));
    deck.extend(std::iter::repeat(Role::Citizen).take(citizens));
    deck.extend(std::iter::repeat(Role::Girl).take(girl));
    deck.extend(std::iter::repeat(Role::Sheriff).take(sheriff));
    deck.extend(std::iter::repeat(Role::Doctor).take(doctor));
    deck
}

/// Deals a shuffled role to every participant and waits until each has seen
/// theirs.
pub struct GreetCitizensEvent {
    core: EventCore,
    accept: AcceptState,
    rng: StdRng,
}

impl GreetCitizensEvent {
    pub fn new(iteration: u32) -> Self {
        Self::with_rng(iteration, StdRng::from_entropy())
    }

    /// Deterministic deal for tests.
    pub fn with_rng(iteration: u32, rng: StdRng) -> Self {
        Self {
            core: EventCore::new(EventName::GreetCitizen, iteration),
            accept: AcceptState::default(),
            rng,
        }
    }
}

impl Event for GreetCitizensEvent {
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

        let mut deck = role_deck(players.len_active());
        deck.shuffle(&mut self.rng);

        for (player, role) in players.active_mut().zip(deck) {
            player.set_role(role);
            let msg = self.core.ok(Action::Role).with_data(json!(role));
            player.send(&msg);
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

/// Shows the mafia their accomplices. Only the mafia are waited on.
pub struct GreetMafiaEvent {
    core: EventCore,
    accept: AcceptState,
}

impl GreetMafiaEvent {
    pub fn new(iteration: u32) -> Self {
        Self {
            core: EventCore::new(EventName::GreetMafia, iteration),
            accept: AcceptState::default(),
        }
    }
}

impl Event for GreetMafiaEvent {
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

        let mafia = roster(players.active().filter(|p| p.role() == Some(Role::Mafia)));
        let msg = self.core.ok(Action::Players).with_data(mafia);
        players.send_to_role(Role::Mafia, &msg);
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
        if self.accept.is_all_accepted(&players.ids_by_role(Role::Mafia)) {
            self.core.finish();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_matches_the_role_table() {
        let count = |deck: &[Role], role: Role| deck.iter().filter(|r| **r == role).count();

        let three = role_deck(3);
        assert_eq!(three.len(), 3);
        assert_eq!(count(&three, Role::Mafia), 1);
        assert_eq!(count(&three, Role::Doctor), 1);
        assert_eq!(count(&three, Role::Citizen), 1);

        let four = role_deck(4);
        assert_eq!(four.len(), 4);
        assert_eq!(count(&four, Role::Girl), 1);
        assert_eq!(count(&four, Role::Sheriff), 0);

        let ten = role_deck(10);
        assert_eq!(ten.len(), 10);
        assert_eq!(count(&ten, Role::Mafia), 3);
        assert_eq!(count(&ten, Role::Doctor), 1);
        assert_eq!(count(&ten, Role::Girl), 1);
        assert_eq!(count(&ten, Role::Sheriff), 1);
        assert_eq!(count(&ten, Role::Citizen), 4);
    }

    #[test]
    fn deck_always_covers_every_player() {
        for n in 3..30 {
            assert_eq!(role_deck(n).len(), n, "deck size for {n} players");
        }
    }
}
