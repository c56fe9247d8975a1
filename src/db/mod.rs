//! Database module
//!
//! Postgres user storage backing the user directory, and the connection
//! pool setup shared with the Postgres session store.

pub mod models;
pub mod operations;
mod password;

pub use models::UserRecord;
pub use operations::UserStore;
pub use password::{hash_password, verify_password};
