pub mod config;
pub mod error;
pub mod events;
pub mod ring;
pub mod types;

pub use config::BotConfig;
pub use error::{BotError, Result, SendOutcome};
pub use ring::{ErrorEntry, ErrorRing};
