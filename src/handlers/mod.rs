//! Demo command vocabulary.
//!
//! Minimal command types and handlers used by the `commandcast` binary.
//! Real services register their own pairs the same way.

pub mod create_user;
pub mod update_user;

pub use create_user::{CreateUser, CreateUserHandler};
pub use update_user::{UpdateUser, UpdateUserHandler};
