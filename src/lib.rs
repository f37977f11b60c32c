//! Commandcast - distributed command bus
//!
//! Executes commands through a local dispatcher and mirrors them to peer
//! processes of the same service family over a pub/sub transport, with
//! guards against re-publication loops and self-consumption.

pub mod bus;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod registry;
