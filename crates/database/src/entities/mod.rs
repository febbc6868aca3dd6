//! Row types owned by the database layer
//!
//! Chat and message rows map straight onto the `courier-chats` entities.

pub mod user;

pub use user::{UpsertUser, User};
