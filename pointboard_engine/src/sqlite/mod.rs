//! SQLite backend for the PointBoard engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
