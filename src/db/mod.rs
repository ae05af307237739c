//! SQLite persistence for sessions, moves, and results.

mod models;
mod repository;
mod schema;

pub use repository::SqliteStore;

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Schema migrations embedded at compile time.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
