//! UpdateUser: purely local mutation, opted out of broadcast.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{Command, CommandPayload};
use crate::dispatch::{CommandHandler, DispatchError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUser {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CommandPayload for UpdateUser {
    const TYPE_NAME: &'static str = "UpdateUser";
    const SHOULD_PUBLISH: bool = false;
}

pub struct UpdateUserHandler;

#[async_trait]
impl CommandHandler for UpdateUserHandler {
    async fn handle(&self, command: &Command) -> Result<(), DispatchError> {
        let payload: UpdateUser = command.payload()?;
        info!(id = %payload.id, "Updating user");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "UpdateUserHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_user_is_local_only() {
        let command = Command::new(&UpdateUser {
            id: "u1".to_string(),
            name: None,
            email: Some("ann@example.com".to_string()),
        })
        .unwrap();

        assert!(!command.should_publish);
    }
}
