//! Local command dispatch.
//!
//! Maps a command's type name to exactly one handler. Handlers are registered
//! through explicit calls at process startup; the command vocabulary is an
//! enumerable artifact, with no runtime discovery on the hot path.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::command::{Command, CommandPayload};
use crate::registry::{CommandRegistry, RegistryError};

/// Errors from local command execution.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for command type '{0}'")]
    NoHandler(String),

    #[error("handler '{name}' failed: {message}")]
    Handler { name: String, message: String },

    #[error("payload decode failed: {0}")]
    Payload(#[from] serde_json::Error),
}

impl DispatchError {
    /// Wrap a handler-specific failure.
    pub fn handler(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Handler {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Handler for one command type.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command. Not retried on failure.
    async fn handle(&self, command: &Command) -> Result<(), DispatchError>;

    /// Handler name for logging and introspection.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A registered command type and its handler, for operational visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBinding {
    pub type_name: String,
    pub handler: &'static str,
}

struct HandlerEntry {
    handler: Box<dyn CommandHandler>,
    handler_name: &'static str,
    register_type: fn(&mut CommandRegistry) -> Result<(), RegistryError>,
}

/// Dispatches commands to their single registered handler.
#[derive(Default)]
pub struct Dispatcher {
    entries: HashMap<String, HandlerEntry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a command type. At most one handler per type;
    /// duplicates are rejected.
    pub fn register<P, H>(&mut self, handler: H) -> Result<(), RegistryError>
    where
        P: CommandPayload,
        H: CommandHandler + 'static,
    {
        if self.entries.contains_key(P::TYPE_NAME) {
            return Err(RegistryError::DuplicateCommandType(P::TYPE_NAME.to_string()));
        }
        let handler_name = handler.name();
        self.entries.insert(
            P::TYPE_NAME.to_string(),
            HandlerEntry {
                handler: Box::new(handler),
                handler_name,
                register_type: |registry| registry.register::<P>(),
            },
        );
        Ok(())
    }

    /// Invoke the handler for the command's type.
    pub async fn dispatch(&self, command: &Command) -> Result<(), DispatchError> {
        let entry = self
            .entries
            .get(&command.type_name)
            .ok_or_else(|| DispatchError::NoHandler(command.type_name.clone()))?;
        entry.handler.handle(command).await
    }

    /// Registered command types and their handler bindings, sorted.
    pub fn bindings(&self) -> Vec<CommandBinding> {
        let mut bindings: Vec<CommandBinding> = self
            .entries
            .iter()
            .map(|(type_name, entry)| CommandBinding {
                type_name: type_name.clone(),
                handler: entry.handler_name,
            })
            .collect();
        bindings.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        bindings
    }

    /// Build a command registry from the registered command/handler pairs.
    ///
    /// The startup-time replacement for runtime handler discovery: call once
    /// after registration and share the result. Cannot fail on duplicates
    /// since `register` already enforces uniqueness.
    pub fn registry(&self) -> Result<CommandRegistry, RegistryError> {
        let mut registry = CommandRegistry::new();
        for entry in self.entries.values() {
            (entry.register_type)(&mut registry)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Serialize, Deserialize)]
    struct Ping {
        seq: u32,
    }

    impl CommandPayload for Ping {
        const TYPE_NAME: &'static str = "Ping";
    }

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandHandler for CountingHandler {
        async fn handle(&self, _command: &Command) -> Result<(), DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "CountingHandler"
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler for FailingHandler {
        async fn handle(&self, _command: &Command) -> Result<(), DispatchError> {
            Err(DispatchError::handler("FailingHandler", "boom"))
        }
    }

    #[tokio::test]
    async fn test_dispatch_invokes_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register::<Ping, _>(CountingHandler {
                calls: calls.clone(),
            })
            .unwrap();

        let command = Command::new(&Ping { seq: 1 }).unwrap();
        dispatcher.dispatch(&command).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_no_handler() {
        let dispatcher = Dispatcher::new();
        let command = Command::new(&Ping { seq: 1 }).unwrap();

        let result = dispatcher.dispatch(&command).await;
        assert!(matches!(result, Err(DispatchError::NoHandler(name)) if name == "Ping"));
    }

    #[tokio::test]
    async fn test_handler_failure_propagates() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register::<Ping, _>(FailingHandler).unwrap();

        let command = Command::new(&Ping { seq: 1 }).unwrap();
        let result = dispatcher.dispatch(&command).await;
        assert!(matches!(result, Err(DispatchError::Handler { .. })));
    }

    #[test]
    fn test_duplicate_handler_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register::<Ping, _>(CountingHandler {
                calls: calls.clone(),
            })
            .unwrap();

        let result = dispatcher.register::<Ping, _>(FailingHandler);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateCommandType(_))
        ));
    }

    #[test]
    fn test_bindings_and_derived_registry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register::<Ping, _>(CountingHandler { calls })
            .unwrap();

        let bindings = dispatcher.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].type_name, "Ping");
        assert_eq!(bindings[0].handler, "CountingHandler");

        let registry = dispatcher.registry().unwrap();
        assert_eq!(registry.type_names(), vec!["Ping"]);
        let command = registry
            .reconstruct("Ping", serde_json::json!({"seq": 3}))
            .unwrap();
        assert!(command.from_transport);
    }
}
