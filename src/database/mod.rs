/*!
 * Database module for persistent storage of cached translations.
 *
 * Owns the SQLite connection wrapper and the schema; the cache backend in
 * `translation::cache::sqlite` issues the queries.
 */

pub mod schema;
pub mod connection;

pub use connection::DatabaseConnection;
