use std::collections::HashMap;

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Outbound message sink. Publishing is fire-and-forget: implementations
/// log their own transport failures.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, queue_name: &str, body: String);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PublishResponse {
    routed: bool,
}

/// Publishes through the RabbitMQ management HTTP API on the default
/// exchange, so the queue name is the routing key.
#[derive(Clone, Debug)]
pub struct RabbitPublisher {
    client: reqwest::Client,
    api_base: String,
    vhost: String,
    user: String,
    password: String,
}

impl RabbitPublisher {
    pub fn new(
        api_base: impl Into<String>,
        vhost: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            vhost: vhost.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    fn publish_url(&self) -> String {
        format!(
            "{}/api/exchanges/{}/amq.default/publish",
            self.api_base,
            self.vhost.replace('/', "%2F")
        )
    }
}

#[async_trait]
impl EventPublisher for RabbitPublisher {
    #[tracing::instrument(skip(self, body))]
    async fn publish(&self, queue_name: &str, body: String) {
        let message = json!({
            "properties": { "content_type": "application/json" },
            "routing_key": queue_name,
            "payload": body,
            "payload_encoding": "string",
        });

        let res = self
            .client
            .post(self.publish_url())
            .basic_auth(&self.user, Some(&self.password))
            .json(&message)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(%err, "could not reach the message broker");
                return;
            }
        };

        let status_code = res.status().as_u16();

        if status_code != 200 {
            tracing::error!(status_code, "message broker rejected the message");
            return;
        }

        match res.json::<PublishResponse>().await {
            Ok(PublishResponse { routed: true }) => {
                tracing::debug!("message published");
            }
            Ok(PublishResponse { routed: false }) => {
                tracing::warn!("message was not routed to any queue");
            }
            Err(err) => {
                tracing::warn!(%err, "unexpected response from the message broker");
            }
        }
    }
}

/// In-process queues. Messages for undeclared queues are dropped.
#[derive(Clone, Debug, Default)]
pub struct ChannelPublisher {
    queues: HashMap<String, Sender<String>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `queue_name` and returns its consuming end.
    pub fn declare(&mut self, queue_name: &str) -> Receiver<String> {
        let (sender, receiver) = async_channel::unbounded();
        self.queues.insert(queue_name.to_string(), sender);

        receiver
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    #[tracing::instrument(skip(self, body))]
    async fn publish(&self, queue_name: &str, body: String) {
        match self.queues.get(queue_name) {
            Some(sender) => {
                if let Err(err) = sender.send(body).await {
                    tracing::error!(%err, "queue is closed");
                }
            }
            None => tracing::warn!("queue is not declared, dropping message"),
        }
    }
}

#[test]
fn channel_publisher_delivers_to_declared_queue() {
    use tokio_test::block_on;

    let mut publisher = ChannelPublisher::new();
    let receiver = publisher.declare("places_import");

    block_on(publisher.publish("places_import", "{}".into()));
    block_on(publisher.publish("unknown", "{}".into()));

    assert_eq!(receiver.try_recv().unwrap(), "{}");
    assert!(receiver.try_recv().is_err());
}

#[test]
fn channel_publisher_survives_closed_queue() {
    use tokio_test::block_on;

    let mut publisher = ChannelPublisher::new();
    let receiver = publisher.declare("places_import");
    drop(receiver);

    block_on(publisher.publish("places_import", "{}".into()));
}

#[test]
fn rabbit_publisher_encodes_vhost() {
    let publisher = RabbitPublisher::new("http://localhost:15672/", "/", "guest", "guest");

    assert_eq!(
        publisher.publish_url(),
        "http://localhost:15672/api/exchanges/%2F/amq.default/publish"
    );
}
