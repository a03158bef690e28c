//! The concrete protocol phases.

mod accept;
mod court;
mod game;
mod game_over;
mod greet;
mod night;

pub use accept::AcceptEvent;
pub use court::{CourtEvent, CourtResultEvent};
pub use game::GameEvent;
pub use game_over::GameOverEvent;
pub use greet::{GreetCitizensEvent, GreetMafiaEvent};
pub use night::{MafiaEvent, NightResultEvent, RoleChoiceEvent, SheriffResultEvent};

use nightcourt_common::{EngineError, Message, Role};

use crate::player::{Player, PlayerId, Players};

/// Resolve the numeric payload of a vote/choice message to an active player.
pub(crate) fn target_from(players: &Players, msg: &Message) -> Result<PlayerId, EngineError> {
    msg.data
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .map(PlayerId)
        .filter(|id| players.get(*id).is_some())
        .ok_or(EngineError::UnknownTarget)
}

/// Gate an action on the acting player holding a specific role.
pub(crate) fn require_role(
    players: &Players,
    player: PlayerId,
    role: Role,
) -> Result<(), EngineError> {
    match players.get_with_out(player).and_then(Player::role) {
        Some(held) if held == role => Ok(()),
        _ => Err(EngineError::WrongRole),
    }
}
