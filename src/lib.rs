//! Credential lifecycle core for the EBPAY accounts service: salted
//! iterated password hashing, a bounded Postgres connection pool, a user
//! repository, and the registration/authentication protocol. The console
//! front-end in `main.rs` is a thin collaborator; it performs no SQL and
//! no hashing.

pub mod auth;
pub mod config;
pub mod store;
pub mod users;
