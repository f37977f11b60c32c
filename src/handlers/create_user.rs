//! CreateUser: broadcast to peer services after local execution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{Command, CommandPayload};
use crate::dispatch::{CommandHandler, DispatchError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub id: String,
    pub name: String,
}

impl CommandPayload for CreateUser {
    const TYPE_NAME: &'static str = "CreateUser";
}

pub struct CreateUserHandler;

#[async_trait]
impl CommandHandler for CreateUserHandler {
    async fn handle(&self, command: &Command) -> Result<(), DispatchError> {
        let payload: CreateUser = command.payload()?;
        info!(
            id = %payload.id,
            name = %payload.name,
            from_transport = command.from_transport,
            "Creating user"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CreateUserHandler"
    }
}
