//! Inbound queue consumer.
//!
//! One long-lived poll loop per consumer instance: long-polls the queue
//! transport, filters out self-originated broadcasts, reconstructs commands
//! through the registry, dispatches them through the command bus, and deletes
//! every received message whether or not dispatch succeeded. Indefinite retry
//! of a non-idempotent command is riskier than a silent drop; redrive policy
//! belongs to the queue transport's configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{CommandBus, Envelope, QueueTransport};
use crate::registry::CommandRegistry;

/// Delay before retrying after a failed receive call.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Poll loop tuning.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Max messages per receive call.
    pub max_messages: i32,
    /// Long-poll wait in seconds.
    pub wait_time_secs: i32,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time_secs: 20,
        }
    }
}

/// How one inbound message was handled. Every outcome is followed by
/// deletion; the distinction exists for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Reconstructed and dispatched successfully.
    Dispatched,
    /// Envelope's source service matched this consumer's own service name.
    SelfOrigin,
    /// No factory registered for the envelope's event type.
    UnknownType,
    /// Body did not parse as an envelope.
    Malformed,
    /// Dispatch was attempted and failed.
    DispatchFailed,
}

/// Long-running consumer of broadcast commands from peer services.
///
/// The self-origin guard compares the envelope's `sourceService` against the
/// configured service name only; independent replicas sharing one service
/// name will drop each other's broadcasts.
pub struct QueueConsumer {
    queue: Arc<dyn QueueTransport>,
    registry: Arc<CommandRegistry>,
    bus: Arc<CommandBus>,
    service_name: String,
    settings: ConsumerSettings,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn QueueTransport>,
        registry: Arc<CommandRegistry>,
        bus: Arc<CommandBus>,
        service_name: impl Into<String>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            queue,
            registry,
            bus,
            service_name: service_name.into(),
            settings,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Whether the poll loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the poll loop. Idempotent if already running.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let queue = self.queue.clone();
        let registry = self.registry.clone();
        let bus = self.bus.clone();
        let service_name = self.service_name.clone();
        let settings = self.settings.clone();
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            info!(service_name = %service_name, "Starting queue consumer");
            poll_loop(queue, registry, bus, service_name, settings, running).await;
            info!("Queue consumer stopped");
        });

        *self.task.lock().await = Some(handle);
    }

    /// Stop cooperatively: the loop exits after its current iteration, with
    /// in-flight receive and message processing allowed to complete.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }
}

async fn poll_loop(
    queue: Arc<dyn QueueTransport>,
    registry: Arc<CommandRegistry>,
    bus: Arc<CommandBus>,
    service_name: String,
    settings: ConsumerSettings,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        let messages = match queue
            .receive(settings.max_messages, settings.wait_time_secs)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %e, "Failed to receive from queue");
                tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                continue;
            }
        };

        for message in messages {
            let outcome =
                process_message(&message.body, &registry, &bus, &service_name).await;
            debug!(message_id = %message.id, outcome = ?outcome, "Processed message");

            // Delete regardless of outcome to prevent redelivery.
            if let Err(e) = queue.delete(&message.receipt).await {
                error!(message_id = %message.id, error = %e, "Failed to delete message");
            }
        }
    }
}

/// Decide and perform the handling of one message body.
///
/// Deletion is the caller's job; every outcome leads to it.
pub async fn process_message(
    body: &str,
    registry: &CommandRegistry,
    bus: &CommandBus,
    service_name: &str,
) -> MessageOutcome {
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Dropping malformed message");
            return MessageOutcome::Malformed;
        }
    };

    if envelope.source_service == service_name {
        debug!(
            event_type = %envelope.event_type,
            "Dropping own broadcast"
        );
        return MessageOutcome::SelfOrigin;
    }

    let command = match registry.reconstruct(&envelope.event_type, envelope.payload) {
        Some(command) => command,
        None => {
            warn!(
                event_type = %envelope.event_type,
                source_service = %envelope.source_service,
                "Dropping unknown command type"
            );
            return MessageOutcome::UnknownType;
        }
    };

    match bus.execute(&command).await {
        Ok(()) => {
            info!(
                event_type = %envelope.event_type,
                source_service = %envelope.source_service,
                "Dispatched inbound command"
            );
            MessageOutcome::Dispatched
        }
        Err(e) => {
            error!(
                event_type = %envelope.event_type,
                error = %e,
                "Inbound dispatch failed"
            );
            MessageOutcome::DispatchFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MockBroadcast, MockQueue, Publisher};
    use crate::command::{Command, CommandPayload};
    use crate::dispatch::{CommandHandler, DispatchError, Dispatcher};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct CreateUser {
        id: String,
        name: String,
    }

    impl CommandPayload for CreateUser {
        const TYPE_NAME: &'static str = "CreateUser";
    }

    struct RecordingHandler {
        seen: Arc<Mutex<Vec<Command>>>,
    }

    #[async_trait]
    impl CommandHandler for RecordingHandler {
        async fn handle(&self, command: &Command) -> Result<(), DispatchError> {
            self.seen.lock().await.push(command.clone());
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler for FailingHandler {
        async fn handle(&self, _command: &Command) -> Result<(), DispatchError> {
            Err(DispatchError::handler("FailingHandler", "always fails"))
        }
    }

    struct Fixture {
        broadcast: Arc<MockBroadcast>,
        registry: Arc<CommandRegistry>,
        bus: Arc<CommandBus>,
        seen: Arc<Mutex<Vec<Command>>>,
    }

    fn fixture(failing: bool) -> Fixture {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        if failing {
            dispatcher.register::<CreateUser, _>(FailingHandler).unwrap();
        } else {
            dispatcher
                .register::<CreateUser, _>(RecordingHandler { seen: seen.clone() })
                .unwrap();
        }
        let registry = Arc::new(dispatcher.registry().unwrap());
        let broadcast = Arc::new(MockBroadcast::new());
        let publisher = Arc::new(Publisher::new(broadcast.clone(), "self"));
        let bus = Arc::new(CommandBus::new(Arc::new(dispatcher), publisher));
        Fixture {
            broadcast,
            registry,
            bus,
            seen,
        }
    }

    fn envelope_body(source: &str) -> String {
        Envelope {
            event_type: "CreateUser".to_string(),
            source_service: source.to_string(),
            payload: serde_json::json!({"id": "u1", "name": "Ann"}),
        }
        .to_body()
        .unwrap()
    }

    #[tokio::test]
    async fn test_peer_message_dispatched_without_republish() {
        let f = fixture(false);

        let outcome =
            process_message(&envelope_body("other"), &f.registry, &f.bus, "self").await;

        assert_eq!(outcome, MessageOutcome::Dispatched);
        let seen = f.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert!(seen[0].from_transport);
        assert_eq!(seen[0].data["name"], "Ann");
        // Transport-origin commands are never re-published.
        assert_eq!(f.broadcast.published_count().await, 0);
    }

    #[tokio::test]
    async fn test_self_origin_dropped() {
        let f = fixture(false);

        let outcome =
            process_message(&envelope_body("self"), &f.registry, &f.bus, "self").await;

        assert_eq!(outcome, MessageOutcome::SelfOrigin);
        assert!(f.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let f = fixture(false);
        let body = Envelope {
            event_type: "DeleteUser".to_string(),
            source_service: "other".to_string(),
            payload: serde_json::json!({}),
        }
        .to_body()
        .unwrap();

        let outcome = process_message(&body, &f.registry, &f.bus, "self").await;
        assert_eq!(outcome, MessageOutcome::UnknownType);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let f = fixture(false);
        let outcome = process_message("not an envelope", &f.registry, &f.bus, "self").await;
        assert_eq!(outcome, MessageOutcome::Malformed);
    }

    #[tokio::test]
    async fn test_dispatch_failure_reported() {
        let f = fixture(true);
        let outcome =
            process_message(&envelope_body("other"), &f.registry, &f.bus, "self").await;
        assert_eq!(outcome, MessageOutcome::DispatchFailed);
    }

    async fn wait_for_deletes(queue: &MockQueue, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if queue.deleted_count().await >= expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for deletes");
    }

    fn consumer(f: &Fixture, queue: Arc<MockQueue>) -> QueueConsumer {
        QueueConsumer::new(
            queue,
            f.registry.clone(),
            f.bus.clone(),
            "self",
            ConsumerSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_loop_deletes_every_message() {
        let f = fixture(false);
        let queue = Arc::new(MockQueue::new());
        queue.push(&envelope_body("other")).await;
        queue.push(&envelope_body("self")).await;
        queue.push("garbage").await;

        let consumer = consumer(&f, queue.clone());
        consumer.start().await;
        wait_for_deletes(&queue, 3).await;
        consumer.stop().await;

        assert_eq!(queue.deleted_count().await, 3);
        // Only the peer message reached the handler.
        assert_eq!(f.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_message_deleted_even_when_dispatch_fails() {
        let f = fixture(true);
        let queue = Arc::new(MockQueue::new());
        queue.push(&envelope_body("other")).await;

        let consumer = consumer(&f, queue.clone());
        consumer.start().await;
        wait_for_deletes(&queue, 1).await;
        consumer.stop().await;

        assert_eq!(queue.deleted_count().await, 1);
    }

    #[tokio::test]
    async fn test_receive_failure_keeps_loop_alive() {
        let f = fixture(false);
        let queue = Arc::new(MockQueue::new());
        queue.set_fail_on_receive(true).await;
        queue.push(&envelope_body("other")).await;

        let consumer = consumer(&f, queue.clone());
        consumer.start().await;
        // Give the loop one failed receive, then recover.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.set_fail_on_receive(false).await;
        wait_for_deletes(&queue, 1).await;
        consumer.stop().await;

        assert_eq!(f.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_start_idempotent_and_stop() {
        let f = fixture(false);
        let queue = Arc::new(MockQueue::new());
        let consumer = consumer(&f, queue);

        consumer.start().await;
        consumer.start().await;
        assert!(consumer.is_running());

        consumer.stop().await;
        assert!(!consumer.is_running());
    }
}
