//! The per-game event engine.
//!
//! Each game is an ordered pipeline of phased events driven by a cooperative
//! scheduler: pending events get processed once, running events wait for
//! inbound actions, done events advance the pipeline. Barriers (accept
//! events) gate every phase on acknowledgements from the right subset of
//! players; night outcomes are derived from the recorded votes and choices
//! of the role events that precede them.

pub mod driver;
pub mod event;
pub mod events;
pub mod game;
pub mod mixins;
pub mod player;
pub mod registry;
pub mod schedule;
pub mod session;

pub use event::{Event, EventStatus};
pub use game::Game;
pub use player::{Player, PlayerId, Players};
pub use registry::{GameId, GameRegistry};
pub use schedule::{EventHistory, EventQueue};
pub use session::Session;
