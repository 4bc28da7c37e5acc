pub mod address;
pub mod covenant;
pub mod parser;
pub mod script;
pub mod tag;
pub mod tx;

pub use covenant::{HtlcCovenant, InputInfo};
pub use parser::{find_lock_events, find_unlock_events};
pub use tag::LockTag;
pub use tx::Transaction;
