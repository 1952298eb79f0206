// Persistence layer
// SQLite holds the store registry and append-only search history;
// LanceDB holds the vectors themselves.

pub mod lancedb;
pub mod sqlite;
