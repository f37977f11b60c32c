//! Command bus bridge.
//!
//! Wraps local dispatch: executes the command through the dispatcher, then,
//! unless the command arrived over the transport or opted out of broadcast,
//! hands it to the outbound publisher. Local-first ordering is deliberate: a
//! process never announces an intent it could not itself carry out.

use std::sync::Arc;

use tracing::debug;

use super::{PublishError, Publisher};
use crate::command::Command;
use crate::dispatch::{DispatchError, Dispatcher};

/// Errors from `CommandBus::execute`.
///
/// Callers can distinguish "dispatch failed" (no local state change) from
/// "dispatch succeeded, broadcast failed" (partial success).
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("command '{type_name}' executed locally but broadcast failed: {source}")]
    Publish {
        type_name: String,
        source: PublishError,
    },
}

/// Executes commands locally and mirrors them to peer services.
pub struct CommandBus {
    dispatcher: Arc<Dispatcher>,
    publisher: Arc<Publisher>,
}

impl CommandBus {
    pub fn new(dispatcher: Arc<Dispatcher>, publisher: Arc<Publisher>) -> Self {
        Self {
            dispatcher,
            publisher,
        }
    }

    /// Dispatch the command, then broadcast it if eligible.
    ///
    /// A command is broadcast only when local dispatch succeeded, it was not
    /// reconstructed from the transport, and its type has not opted out of
    /// publication. Dispatch failures are never retried here.
    pub async fn execute(&self, command: &Command) -> Result<(), ExecuteError> {
        self.dispatcher.dispatch(command).await?;

        if command.from_transport || !command.should_publish {
            debug!(
                type_name = %command.type_name,
                from_transport = command.from_transport,
                should_publish = command.should_publish,
                "Skipping broadcast"
            );
            return Ok(());
        }

        self.publisher
            .publish(command)
            .await
            .map_err(|source| ExecuteError::Publish {
                type_name: command.type_name.clone(),
                source,
            })
    }
}
