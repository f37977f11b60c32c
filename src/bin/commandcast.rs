//! commandcast: distributed command bus process
//!
//! Wires the command bus together from configuration: registers the command
//! vocabulary, connects the SNS broadcast and SQS queue transports, starts
//! the inbound consumer, and runs until interrupted.
//!
//! ## Configuration
//! - COMMANDCAST_CONFIG: path to a YAML config file
//! - COMMANDCAST__SERVICE_NAME: service identity for the self-origin guard
//! - COMMANDCAST__SNS__TOPIC_ARN: broadcast topic
//! - COMMANDCAST__SQS__QUEUE_URL: inbound queue
//! - COMMANDCAST_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commandcast::bus::{
    CommandBus, ConsumerSettings, Publisher, QueueConsumer, SnsBroadcast, SnsSqsConfig, SqsQueue,
};
use commandcast::config::{Config, LOG_ENV_VAR};
use commandcast::dispatch::Dispatcher;
use commandcast::handlers::{
    CreateUser, CreateUserHandler, UpdateUser, UpdateUserHandler,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(None)?;
    info!(service_name = %config.service_name, "Starting commandcast");

    let mut dispatcher = Dispatcher::new();
    dispatcher.register::<CreateUser, _>(CreateUserHandler)?;
    dispatcher.register::<UpdateUser, _>(UpdateUserHandler)?;

    for binding in dispatcher.bindings() {
        info!(
            type_name = %binding.type_name,
            handler = %binding.handler,
            "Registered command"
        );
    }

    let registry = Arc::new(dispatcher.registry()?);

    let transport_config = SnsSqsConfig {
        region: config.aws.region.clone(),
        endpoint_url: config.aws.endpoint_url.clone(),
        topic_arn: config.sns.topic_arn.clone(),
        queue_url: config.sqs.queue_url.clone(),
    };

    let broadcast = Arc::new(SnsBroadcast::new(&transport_config).await);
    let queue = Arc::new(SqsQueue::new(&transport_config).await);

    let publisher = Arc::new(Publisher::new(broadcast, config.service_name.clone()));
    let bus = Arc::new(CommandBus::new(Arc::new(dispatcher), publisher));

    let consumer = QueueConsumer::new(
        queue,
        registry,
        bus,
        config.service_name.clone(),
        ConsumerSettings {
            max_messages: config.consumer.max_messages,
            wait_time_secs: config.consumer.wait_time_secs,
        },
    );
    consumer.start().await;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    consumer.stop().await;

    Ok(())
}
