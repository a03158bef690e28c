//! The abstract unit of the protocol: a named phase with an iteration,
//! a monotone status, a one-shot `process` hook and an action dispatcher.

use nightcourt_common::{Action, EngineError, EventName, Message};

use crate::mixins::{ChoiceState, VoteState};
use crate::player::{Player, PlayerId, Players};
use crate::schedule::EventHistory;

/// Lifecycle of an event. Transitions only ever move forward; done is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventStatus {
    Pending = 1,
    Running = 2,
    Done = 3,
}

impl EventStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The state every event shares: name, iteration, status. Also the factory
/// for envelopes stamped with this event's identity.
#[derive(Debug, Clone)]
pub struct EventCore {
    name: EventName,
    iteration: u32,
    status: EventStatus,
}

impl EventCore {
    pub fn new(name: EventName, iteration: u32) -> Self {
        Self {
            name,
            iteration,
            status: EventStatus::Pending,
        }
    }

    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// Status never decreases.
    pub fn set_status(&mut self, status: EventStatus) {
        if status > self.status {
            self.status = status;
        }
    }

    pub fn begin(&mut self) {
        self.set_status(EventStatus::Running);
    }

    pub fn finish(&mut self) {
        self.set_status(EventStatus::Done);
    }

    pub fn ok(&self, action: Action) -> Message {
        Message::ok(self.name, self.iteration, action)
    }

    pub fn err(&self, action: Action, reason: &EngineError) -> Message {
        Message::err(self.name, self.iteration, action, reason)
    }
}

/// A protocol phase. The scheduler only ever talks to events through this
/// interface; history lookups use the capability accessors.
pub trait Event: Send {
    fn core(&self) -> &EventCore;

    fn core_mut(&mut self) -> &mut EventCore;

    fn name(&self) -> EventName {
        self.core().name()
    }

    fn iteration(&self) -> u32 {
        self.core().iteration()
    }

    fn status(&self) -> EventStatus {
        self.core().status()
    }

    fn set_status(&mut self, status: EventStatus) {
        self.core_mut().set_status(status);
    }

    /// Runs exactly once when the event becomes current. Emits any initial
    /// fan-out messages; may complete the event immediately when it does not
    /// apply (for example a role event whose role-holder is absent).
    fn process(
        &mut self,
        _players: &mut Players,
        _history: &EventHistory,
    ) -> Result<(), EngineError> {
        self.core_mut().begin();
        Ok(())
    }

    /// Apply an inbound action from `player`. Unknown actions are reported
    /// as errors for the router to log; protocol violations send an err
    /// envelope to the originator before surfacing.
    fn action(
        &mut self,
        action: Action,
        players: &mut Players,
        history: &EventHistory,
        player: PlayerId,
        msg: &Message,
    ) -> Result<(), EngineError>;

    /// Admission hook for the pre-game event: consumes a detached player.
    /// Every other event refuses and hands the player back.
    fn admit(
        &mut self,
        _players: &mut Players,
        player: Player,
        msg: &Message,
    ) -> Result<PlayerId, (Player, EngineError)> {
        Err((
            player,
            EngineError::UnknownAction {
                event: self.core().name(),
                action: msg.action,
            },
        ))
    }

    fn as_choice(&self) -> Option<&ChoiceState> {
        None
    }

    fn as_vote(&self) -> Option<&VoteState> {
        None
    }
}

/// Send an err envelope for a protocol violation back to the player that
/// caused it.
pub(crate) fn reject(
    core: &EventCore,
    players: &mut Players,
    player: PlayerId,
    action: Action,
    reason: &EngineError,
) {
    players.send_to(player, &core.err(action, reason));
}
