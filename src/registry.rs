//! Command registry.
//!
//! Maps a command's logical type name to a factory that reconstructs a typed
//! command from raw wire data. Populated once at process startup, read-only
//! thereafter; safe for concurrent lookup from multiple consumer workers.

use std::collections::HashMap;

use crate::command::{Command, CommandPayload};

/// Factory that validates raw payload data and builds a transport-origin
/// command.
type CommandFactory = Box<dyn Fn(serde_json::Value) -> Option<Command> + Send + Sync>;

/// Errors raised while populating the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A factory is already registered for this type name. Registration is
    /// rejected rather than overwritten so wiring mistakes surface at
    /// startup, before any consumer runs.
    #[error("duplicate command type '{0}'")]
    DuplicateCommandType(String),
}

/// Read-only mapping from command type names to reconstruction factories.
#[derive(Default)]
pub struct CommandRegistry {
    factories: HashMap<String, CommandFactory>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command type. Duplicate registration is rejected.
    pub fn register<P: CommandPayload>(&mut self) -> Result<(), RegistryError> {
        self.register_factory(
            P::TYPE_NAME,
            Box::new(|data| {
                // Validate the payload shape before accepting the command.
                serde_json::from_value::<P>(data.clone()).ok()?;
                Some(Command::from_wire(P::TYPE_NAME, data, P::SHOULD_PUBLISH))
            }),
        )
    }

    pub(crate) fn register_factory(
        &mut self,
        type_name: &str,
        factory: CommandFactory,
    ) -> Result<(), RegistryError> {
        if self.factories.contains_key(type_name) {
            return Err(RegistryError::DuplicateCommandType(type_name.to_string()));
        }
        self.factories.insert(type_name.to_string(), factory);
        Ok(())
    }

    /// Look up the factory for a type name.
    pub fn resolve(&self, type_name: &str) -> Option<&CommandFactory> {
        self.factories.get(type_name)
    }

    /// Registered type names, sorted, for the introspection surface.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Reconstruct a transport-origin command from wire data.
    ///
    /// Returns `None` for unknown types or payloads that fail validation;
    /// both are expected from newer/older peers during rolling deploys and
    /// are for the caller to log and drop, not fatal errors.
    pub fn reconstruct(&self, type_name: &str, data: serde_json::Value) -> Option<Command> {
        let factory = self.factories.get(type_name)?;
        factory(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct CreateUser {
        id: String,
        name: String,
    }

    impl CommandPayload for CreateUser {
        const TYPE_NAME: &'static str = "CreateUser";
    }

    #[test]
    fn test_reconstruct_sets_transport_origin() {
        let mut registry = CommandRegistry::new();
        registry.register::<CreateUser>().unwrap();

        let data = serde_json::json!({"id": "u1", "name": "Ann"});
        let command = registry.reconstruct("CreateUser", data.clone()).unwrap();

        assert!(command.from_transport);
        assert_eq!(command.type_name, "CreateUser");
        assert_eq!(command.data, data);
    }

    #[test]
    fn test_unknown_type_returns_none() {
        let registry = CommandRegistry::new();
        assert!(registry
            .reconstruct("Nope", serde_json::json!({}))
            .is_none());
    }

    #[test]
    fn test_invalid_payload_returns_none() {
        let mut registry = CommandRegistry::new();
        registry.register::<CreateUser>().unwrap();

        // Missing required fields fails payload validation.
        assert!(registry
            .reconstruct("CreateUser", serde_json::json!({"id": 42}))
            .is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register::<CreateUser>().unwrap();

        let result = registry.register::<CreateUser>();
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateCommandType(name)) if name == "CreateUser"
        ));
    }

    #[test]
    fn test_type_names_sorted() {
        #[derive(Serialize, Deserialize)]
        struct A;
        impl CommandPayload for A {
            const TYPE_NAME: &'static str = "Alpha";
        }
        #[derive(Serialize, Deserialize)]
        struct B;
        impl CommandPayload for B {
            const TYPE_NAME: &'static str = "Beta";
        }

        let mut registry = CommandRegistry::new();
        registry.register::<B>().unwrap();
        registry.register::<A>().unwrap();

        assert_eq!(registry.type_names(), vec!["Alpha", "Beta"]);
    }
}
