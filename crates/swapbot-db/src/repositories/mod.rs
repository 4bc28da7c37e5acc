mod b2s;
mod cursor;
mod s2b;

pub use b2s::B2sRepository;
pub use cursor::CursorRepository;
pub use s2b::S2bRepository;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}
