//! The wire envelope. Every peer message, inbound or outbound, is this shape.
//!
//! Outbound envelopes always carry a status; inbound ones omit it. The
//! `iteration` and `event` fields are copied from the emitting event so a
//! client can always tell which phase a message belongs to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Err,
}

/// Protocol phase tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    Game,
    GameStart,
    GameOver,
    Day,
    Night,
    NightResult,
    Court,
    CourtResult,
    Mafia,
    Doctor,
    Sheriff,
    SheriffResult,
    Girl,
    GreetMafia,
    GreetCitizen,
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            EventName::Game => "game",
            EventName::GameStart => "game_start",
            EventName::GameOver => "game_over",
            EventName::Day => "day",
            EventName::Night => "night",
            EventName::NightResult => "night_result",
            EventName::Court => "court",
            EventName::CourtResult => "court_result",
            EventName::Mafia => "mafia",
            EventName::Doctor => "doctor",
            EventName::Sheriff => "sheriff",
            EventName::SheriffResult => "sheriff_result",
            EventName::Girl => "girl",
            EventName::GreetMafia => "greet_mafia",
            EventName::GreetCitizen => "greet_citizen",
        };
        write!(f, "{tag}")
    }
}

/// Action tags as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Reconnect,
    Join,
    Start,
    End,
    Over,
    Role,
    Players,
    Accept,
    Vote,
    Choice,
    Out,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Action::Create => "create",
            Action::Reconnect => "reconnect",
            Action::Join => "join",
            Action::Start => "start",
            Action::End => "end",
            Action::Over => "over",
            Action::Role => "role",
            Action::Players => "players",
            Action::Accept => "accept",
            Action::Vote => "vote",
            Action::Choice => "choice",
            Action::Out => "out",
        };
        write!(f, "{tag}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Absent on inbound messages; always set on outbound ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// The event iteration this message applies to. 0 before a game exists.
    #[serde(default)]
    pub iteration: u32,
    pub event: EventName,
    pub action: Action,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    /// An ok envelope stamped with the emitting event's name and iteration.
    pub fn ok(event: EventName, iteration: u32, action: Action) -> Self {
        Self {
            status: Some(Status::Ok),
            iteration,
            event,
            action,
            data: Value::Null,
        }
    }

    /// An err envelope; `data` carries the human-readable reason.
    pub fn err(event: EventName, iteration: u32, action: Action, reason: impl ToString) -> Self {
        Self {
            status: Some(Status::Err),
            iteration,
            event,
            action,
            data: Value::String(reason.to_string()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn is_err(&self) -> bool {
        self.status == Some(Status::Err)
    }
}
