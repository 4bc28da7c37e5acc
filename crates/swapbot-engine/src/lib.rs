mod bot;
mod server;
mod status;

pub use bot::{EngineConfig, SwapBot};
pub use server::{serve_status, StatusState};
pub use status::{gather_info, BotInfo, SwapInfo};
