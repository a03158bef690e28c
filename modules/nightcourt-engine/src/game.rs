//! One game: its participants, its event pipeline, and the transition
//! table that regenerates the pipeline phase by phase.

use nightcourt_common::{Action, EngineError, EventName, Message, Role};

use crate::event::{Event, EventStatus};
use crate::events::{
    AcceptEvent, CourtEvent, CourtResultEvent, GameEvent, GameOverEvent, GreetCitizensEvent,
    GreetMafiaEvent, MafiaEvent, NightResultEvent, RoleChoiceEvent, SheriffResultEvent,
};
use crate::player::{Player, PlayerId, Players};
use crate::registry::GameId;
use crate::schedule::{EventHistory, EventQueue};

pub struct Game {
    id: GameId,
    players: Players,
    queue: EventQueue,
    history: EventHistory,
    event: Box<dyn Event>,
    iteration: u32,
    winner: Option<Role>,
}

impl Game {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            players: Players::new(),
            queue: EventQueue::new(),
            history: EventHistory::new(),
            event: Box::new(GameEvent::new(id)),
            iteration: 1,
            winner: None,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: u32) {
        self.iteration = iteration;
    }

    pub fn winner(&self) -> Option<Role> {
        self.winner
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut Players {
        &mut self.players
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    pub fn current(&self) -> &dyn Event {
        self.event.as_ref()
    }

    pub fn current_mut(&mut self) -> &mut dyn Event {
        self.event.as_mut()
    }

    pub fn set_current(&mut self, event: Box<dyn Event>) {
        self.event = event;
    }

    /// Evaluate the termination condition and record the winner.
    ///
    /// Never true during setup: roles have not been dealt yet, so the
    /// counts would be meaningless.
    pub fn is_over(&mut self) -> bool {
        if matches!(
            self.event.name(),
            EventName::Game | EventName::GameStart | EventName::GreetCitizen | EventName::GreetMafia
        ) {
            return false;
        }

        let mafia = self.players.role_count(Role::Mafia);
        let town = self.players.role_count(Role::Citizen)
            + self.players.role_count(Role::Sheriff)
            + self.players.role_count(Role::Girl)
            + self.players.role_count(Role::Doctor);

        if town == 0 {
            self.winner = Some(Role::Mafia);
        }
        if mafia == 0 {
            self.winner = Some(Role::Citizen);
        }

        self.winner.is_some()
    }

    /// One scheduler step: process a pending event, advance past a done one,
    /// leave a running one to its inbound actions.
    pub fn tick(&mut self) {
        match self.event.status() {
            EventStatus::Pending => {
                if let Err(err) = self.event.process(&mut self.players, &self.history) {
                    tracing::warn!(game = %self.id, event = %self.event.name(), error = %err, "event process");
                }
            }
            EventStatus::Running => {}
            EventStatus::Done => {
                if let Err(err) = self.advance() {
                    tracing::warn!(game = %self.id, error = %err, "no next event");
                }
            }
        }
    }

    /// Swap in the next event, archiving the current one.
    pub fn advance(&mut self) -> Result<(), EngineError> {
        if self.queue.is_empty() {
            self.refill_queue();
        }

        match self.queue.pop() {
            Some(next) => {
                let previous = std::mem::replace(&mut self.event, next);
                self.history.push(previous);
                Ok(())
            }
            None => Err(EngineError::Inconsistent(format!(
                "no transition from {}",
                self.event.name()
            ))),
        }
    }

    /// Regenerate the queue from the current event's name.
    ///
    /// Each arm enqueues one block and stops; phases whose role-holder is
    /// absent fall through to the next phase name and re-evaluate.
    fn refill_queue(&mut self) {
        let mut from = self.event.name();
        loop {
            if self.is_over() {
                if let Some(winner) = self.winner {
                    self.queue
                        .push(Box::new(GameOverEvent::new(self.iteration, winner)));
                }
                return;
            }

            let iteration = self.iteration;
            match from {
                EventName::Game => {
                    self.enqueue_barrier(EventName::GameStart, Action::Start);
                    return;
                }
                EventName::GameStart => {
                    self.enqueue_barrier(EventName::GreetCitizen, Action::Start);
                    self.queue.push(Box::new(GreetCitizensEvent::new(iteration)));
                    self.enqueue_barrier(EventName::GreetCitizen, Action::End);
                    return;
                }
                EventName::GreetCitizen => {
                    self.enqueue_barrier(EventName::Night, Action::Start);
                    return;
                }
                EventName::Night => {
                    if iteration == 1 {
                        self.enqueue_barrier(EventName::GreetMafia, Action::Start);
                        self.queue.push(Box::new(GreetMafiaEvent::new(iteration)));
                        self.enqueue_barrier(EventName::GreetMafia, Action::End);
                    } else {
                        self.enqueue_barrier(EventName::Mafia, Action::Start);
                        self.queue.push(Box::new(MafiaEvent::new(iteration)));
                        self.enqueue_barrier(EventName::Mafia, Action::End);
                    }
                    return;
                }
                EventName::GreetMafia => {
                    self.enqueue_barrier(EventName::Day, Action::Start);
                    return;
                }
                EventName::Mafia => {
                    if self.players.one_by_role(Role::Doctor).is_some() {
                        self.enqueue_barrier(EventName::Doctor, Action::Start);
                        self.queue.push(Box::new(RoleChoiceEvent::doctor(iteration)));
                        self.enqueue_barrier(EventName::Doctor, Action::End);
                        return;
                    }
                    from = EventName::Doctor;
                }
                EventName::Doctor => {
                    if self.players.one_by_role(Role::Sheriff).is_some() {
                        self.enqueue_barrier(EventName::Sheriff, Action::Start);
                        self.queue.push(Box::new(RoleChoiceEvent::sheriff(iteration)));
                        self.queue.push(Box::new(SheriffResultEvent::new(iteration)));
                        self.enqueue_barrier(EventName::Sheriff, Action::End);
                        return;
                    }
                    from = EventName::Sheriff;
                }
                EventName::Sheriff => {
                    if self.players.one_by_role(Role::Girl).is_some() {
                        self.enqueue_barrier(EventName::Girl, Action::Start);
                        self.queue.push(Box::new(RoleChoiceEvent::girl(iteration)));
                        self.enqueue_barrier(EventName::Girl, Action::End);
                        return;
                    }
                    from = EventName::Girl;
                }
                EventName::Girl => {
                    self.enqueue_barrier(EventName::Day, Action::Start);
                    return;
                }
                EventName::Day => {
                    if iteration != 1 {
                        self.queue.push(Box::new(NightResultEvent::new(iteration)));
                        return;
                    }
                    // The first day has no night behind it.
                    from = EventName::NightResult;
                }
                EventName::NightResult => {
                    self.enqueue_barrier(EventName::Court, Action::Start);
                    self.queue.push(Box::new(CourtEvent::new(iteration)));
                    self.queue.push(Box::new(CourtResultEvent::new(iteration)));
                    self.enqueue_barrier(EventName::Court, Action::End);
                    return;
                }
                EventName::Court => {
                    self.iteration += 1;
                    self.enqueue_barrier(EventName::Night, Action::Start);
                    return;
                }
                EventName::CourtResult | EventName::SheriffResult | EventName::GameOver => {
                    // These only ever complete with a sibling still queued.
                    tracing::error!(game = %self.id, event = %from, "no transition from this event");
                    return;
                }
            }
        }
    }

    fn enqueue_barrier(&mut self, name: EventName, action: Action) {
        self.queue
            .push(Box::new(AcceptEvent::new(self.iteration, name, action)));
    }

    /// Route an inbound message to the current event.
    pub fn on_message(&mut self, player: PlayerId, msg: &Message) -> Result<(), EngineError> {
        if let Some(p) = self.players.get_with_out_mut(player) {
            p.set_last_received(msg.clone());
        }
        self.event
            .action(msg.action, &mut self.players, &self.history, player, msg)
    }

    /// Hand a detached player to the current event for admission.
    pub fn admit(
        &mut self,
        player: Player,
        msg: &Message,
    ) -> Result<PlayerId, (Player, EngineError)> {
        self.event.admit(&mut self.players, player, msg)
    }
}
