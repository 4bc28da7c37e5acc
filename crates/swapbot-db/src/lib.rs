mod models;
mod pool;
pub mod repositories;

pub use pool::Db;
