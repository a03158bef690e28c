use thiserror::Error;

use crate::envelope::{Action, EventName};
use crate::role::Role;

/// Everything that can go wrong inside a game without killing it.
///
/// Protocol violations double as the client-facing reason: the display
/// string is what lands in the `data` field of the err envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("username already exists")]
    UsernameTaken,

    #[error("invalid username")]
    InvalidUsername,

    #[error("you have not rights to start game")]
    NotMaster,

    #[error("too few players to start game")]
    TooFewPlayers,

    #[error("player have wrong role for this action")]
    WrongRole,

    #[error("invalid player id")]
    UnknownTarget,

    #[error("you can not do this action with this player several times in a row")]
    RepeatedTarget,

    #[error("invalid gameId")]
    UnknownGame,

    #[error("invalid playerId")]
    UnknownPlayer,

    #[error("game is over")]
    GameFinished,

    #[error("undefined action {action} for event {event}")]
    UnknownAction { event: EventName, action: Action },

    #[error("{0} is not active")]
    RoleAbsent(Role),

    /// Internal bookkeeping went sideways (missed history lookup, void
    /// ballot). Logged, never sent to clients, never fatal.
    #[error("{0}")]
    Inconsistent(String),
}
