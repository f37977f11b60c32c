//! AWS SNS/SQS transport implementation.
//!
//! Publishes broadcast envelopes to an SNS topic and consumes them from an
//! SQS queue subscribed to that topic. The envelope travels as the JSON
//! message body; `eventType` and `sourceService` are also set as message
//! attributes for broker-side visibility and filtering.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sqs::Client as SqsClient;
use tracing::{debug, info};

use super::{BroadcastTransport, Envelope, QueueMessage, QueueTransport, Result, TransportError};

/// Message attribute name for the command's type name.
const EVENT_TYPE_ATTR: &str = "eventType";

/// Message attribute name for the publishing service's identity.
const SOURCE_SERVICE_ATTR: &str = "sourceService";

/// Configuration for the AWS SNS/SQS connection.
#[derive(Clone, Debug, Default)]
pub struct SnsSqsConfig {
    /// AWS region. Uses the default provider chain if not set.
    pub region: Option<String>,
    /// Custom endpoint URL (for LocalStack or testing).
    pub endpoint_url: Option<String>,
    /// SNS topic ARN for publishing.
    pub topic_arn: String,
    /// SQS queue URL for consuming.
    pub queue_url: String,
}

impl SnsSqsConfig {
    pub fn new(topic_arn: impl Into<String>, queue_url: impl Into<String>) -> Self {
        Self {
            region: None,
            endpoint_url: None,
            topic_arn: topic_arn.into(),
            queue_url: queue_url.into(),
        }
    }

    /// Set the AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint URL (for LocalStack or testing).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let mut builder = aws_config::defaults(BehaviorVersion::latest());

        if let Some(ref region) = self.region {
            builder = builder.region(aws_config::Region::new(region.clone()));
        }
        if let Some(ref endpoint) = self.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        builder.load().await
    }
}

/// SNS broadcast transport.
pub struct SnsBroadcast {
    sns: SnsClient,
    topic_arn: String,
}

impl SnsBroadcast {
    pub async fn new(config: &SnsSqsConfig) -> Self {
        let sdk_config = config.load_sdk_config().await;
        let sns = SnsClient::new(&sdk_config);

        info!(
            region = ?config.region,
            endpoint = ?config.endpoint_url,
            topic_arn = %config.topic_arn,
            "Connected to AWS SNS"
        );

        Self {
            sns,
            topic_arn: config.topic_arn.clone(),
        }
    }
}

#[async_trait]
impl BroadcastTransport for SnsBroadcast {
    async fn publish(&self, envelope: &Envelope) -> Result<()> {
        use aws_sdk_sns::types::MessageAttributeValue;

        let body = envelope
            .to_body()
            .map_err(|e| TransportError::Publish(e.to_string()))?;

        let event_type_attr = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(&envelope.event_type)
            .build()
            .map_err(|e| TransportError::Publish(format!("Failed to build attribute: {}", e)))?;
        let source_service_attr = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(&envelope.source_service)
            .build()
            .map_err(|e| TransportError::Publish(format!("Failed to build attribute: {}", e)))?;

        self.sns
            .publish()
            .topic_arn(&self.topic_arn)
            .message(&body)
            .message_attributes(EVENT_TYPE_ATTR, event_type_attr)
            .message_attributes(SOURCE_SERVICE_ATTR, source_service_attr)
            .send()
            .await
            .map_err(|e| TransportError::Publish(format!("Failed to publish to SNS: {}", e)))?;

        debug!(
            event_type = %envelope.event_type,
            topic_arn = %self.topic_arn,
            "Published envelope to SNS"
        );
        Ok(())
    }
}

/// SQS queue transport.
pub struct SqsQueue {
    sqs: SqsClient,
    queue_url: String,
}

impl SqsQueue {
    pub async fn new(config: &SnsSqsConfig) -> Self {
        let sdk_config = config.load_sdk_config().await;
        let sqs = SqsClient::new(&sdk_config);

        info!(
            region = ?config.region,
            endpoint = ?config.endpoint_url,
            queue_url = %config.queue_url,
            "Connected to AWS SQS"
        );

        Self {
            sqs,
            queue_url: config.queue_url.clone(),
        }
    }
}

#[async_trait]
impl QueueTransport for SqsQueue {
    async fn receive(&self, max_messages: i32, wait_time_secs: i32) -> Result<Vec<QueueMessage>> {
        let output = self
            .sqs
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_secs)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| TransportError::Receive(format!("Failed to receive from SQS: {}", e)))?;

        let messages = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                // A message without a body or receipt cannot be processed or
                // acknowledged; the visibility timeout will re-expose it.
                Some(QueueMessage {
                    id: message.message_id.unwrap_or_default(),
                    body: message.body?,
                    receipt: message.receipt_handle?,
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, receipt: &str) -> Result<()> {
        self.sqs
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| TransportError::Delete(format!("Failed to delete from SQS: {}", e)))?;

        debug!(queue_url = %self.queue_url, "Deleted message");
        Ok(())
    }
}
