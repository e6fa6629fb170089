use async_trait::async_trait;
use shared::{Order, OrderStatus};
use tracing::info;

/// Best-effort outbound customer messaging. A `false` return is logged by the
/// caller and never rolls back the order change that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &str, subject: &str, body: &str) -> bool;
}

/// Writes every notification to the log instead of delivering it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &str, subject: &str, body: &str) -> bool {
        info!(%email, %subject, %body, "Notification");
        true
    }
}

/// Subject and body for the message sent when staff accept or decline an order.
pub fn status_message(order: &Order) -> Option<(String, String)> {
    let (subject, verdict) = match order.status {
        OrderStatus::Preparing => ("Your order has been accepted", "accepted and is being prepared"),
        OrderStatus::Cancelled => ("Your order has been declined", "declined"),
        _ => return None,
    };
    let body = format!(
        "Hi {},\n\nYour order {} ({} item(s), ${}) has been {}.\n\nThank you for ordering with us.",
        order.customer_name,
        order.id,
        order.quantity,
        order.total_price.with_scale(2),
        verdict
    );
    Some((subject.to_string(), body))
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaNotifier;

#[cfg(feature = "kafka")]
mod kafka {
    use super::Notifier;
    use async_trait::async_trait;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use serde_json::json;
    use std::time::Duration;
    use tracing::error;

    /// Hands notifications to a mail relay listening on a Kafka topic.
    pub struct KafkaNotifier {
        producer: FutureProducer,
        topic: String,
    }

    impl KafkaNotifier {
        pub fn new(brokers: &str, topic: &str) -> anyhow::Result<Self> {
            let producer: FutureProducer = ClientConfig::new()
                .set("bootstrap.servers", brokers)
                .set("message.timeout.ms", "5000")
                .create()?;
            Ok(Self {
                producer,
                topic: topic.to_string(),
            })
        }
    }

    #[async_trait]
    impl Notifier for KafkaNotifier {
        async fn send(&self, email: &str, subject: &str, body: &str) -> bool {
            let json = json!({ "email": email, "subject": subject, "body": body }).to_string();
            let record = FutureRecord::to(&self.topic).payload(&json).key(email);

            match self.producer.send(record, Duration::from_secs(5)).await {
                Ok(_) => true,
                Err((e, _)) => {
                    error!("Failed to publish notification for {}: {}", email, e);
                    false
                }
            }
        }
    }
}
