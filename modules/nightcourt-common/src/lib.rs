pub mod config;
pub mod envelope;
pub mod error;
pub mod role;

pub use config::ServerConfig;
pub use envelope::{Action, EventName, Message, Status};
pub use error::EngineError;
pub use role::Role;
