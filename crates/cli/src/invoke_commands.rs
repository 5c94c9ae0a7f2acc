//! One-shot invocations: the same entry points a serverless host would call,
//! fed from a file or stdin.

use std::{io::Read, path::Path};

use {
    anyhow::{Context, Result},
    clap::ValueEnum,
    secrecy::Secret,
    serde_json::Value,
    tracing::{info, warn},
    unfurler_callback::{
        Dispatcher,
        adapters::http_event::{self, HttpEvent, HttpEventResponse},
    },
    unfurler_config::UnfurlerConfig,
    unfurler_queue::QueueHandle,
    unfurler_worker::{
        UnfurlRequest, UnfurlWorker,
        adapters::{self, pubsub, sns},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryFormat {
    /// Pub/Sub push envelope or background-function message.
    Pubsub,
    /// SNS notification event with one or more records.
    Sns,
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        },
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        },
    }
}

/// Dispatch one HTTP event and print `{statusCode, body}`.
pub async fn dispatch(config: &UnfurlerConfig, input: Option<&Path>) -> Result<()> {
    let event: HttpEvent =
        serde_json::from_str(&read_input(input)?).context("parsing HTTP event")?;

    let queue = unfurler_queue::from_config(&config.queue, reqwest::Client::new())?;
    let response =
        dispatch_event(queue, config.slack.verification_token.clone(), &event).await?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

/// Run one event through a dispatcher bound to `queue`.
///
/// Nothing consumes a memory queue during a one-shot run, so its deliveries
/// are drained and dropped while the dispatcher publishes.
async fn dispatch_event(
    queue: QueueHandle,
    verification_token: Secret<String>,
    event: &HttpEvent,
) -> Result<HttpEventResponse> {
    let QueueHandle {
        publisher,
        consumer,
    } = queue;
    let drain = consumer.map(|mut consumer| {
        tokio::spawn(async move {
            while let Some(delivery) = consumer.recv().await {
                warn!(
                    message_id = %delivery.message_id,
                    link = %delivery.message.link,
                    "no memory queue consumer in this command, delivery dropped"
                );
            }
        })
    });

    let dispatcher = Dispatcher::new(verification_token, publisher);
    let response = http_event::handle(&dispatcher, event).await;
    // Last publisher handle; the drain task ends once it is gone.
    drop(dispatcher);
    if let Some(drain) = drain {
        drain.await.context("memory queue drain task")?;
    }
    Ok(response?)
}

/// Translate a delivery document into worker requests.
fn delivery_requests(
    format: DeliveryFormat,
    raw: &str,
    event_id: Option<&str>,
) -> Result<Vec<UnfurlRequest>> {
    let value: Value = serde_json::from_str(raw).context("parsing delivery")?;
    let requests = match format {
        DeliveryFormat::Pubsub if value.get("message").is_some() => {
            let envelope: pubsub::PushEnvelope = serde_json::from_value(value)?;
            vec![pubsub::from_push(&envelope)]
        },
        DeliveryFormat::Pubsub => {
            let message: pubsub::PubSubMessage = serde_json::from_value(value)?;
            vec![pubsub::from_message(&message, event_id)]
        },
        DeliveryFormat::Sns => {
            let event: sns::SnsEvent = serde_json::from_value(value)?;
            sns::to_requests(&event)
        },
    };
    Ok(requests)
}

pub async fn consume(
    config: &UnfurlerConfig,
    format: DeliveryFormat,
    event_id: Option<&str>,
    input: Option<&Path>,
) -> Result<()> {
    let requests = delivery_requests(format, &read_input(input)?, event_id)?;
    let worker = UnfurlWorker::from_config(config, reqwest::Client::new());
    let outcomes = adapters::run_sequential(&worker, &requests).await?;
    info!(processed = outcomes.len(), "delivery processed");
    Ok(())
}

pub async fn unfurl(config: &UnfurlerConfig, link: String, ts: String, channel: String) -> Result<()> {
    let worker = UnfurlWorker::from_config(config, reqwest::Client::new());
    let request = UnfurlRequest {
        message_id: None,
        link: Some(link),
        ts: Some(ts),
        channel: Some(channel),
    };
    let outcome = worker.unfurl(&request).await?;
    info!(?outcome, "unfurl finished");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        serde_json::json,
        std::{sync::Arc, time::Duration},
    };

    #[tokio::test]
    async fn memory_dispatch_does_not_block_past_capacity() {
        let (publisher, consumer) = unfurler_queue::memory::channel(1);
        let queue = QueueHandle {
            publisher: Arc::new(publisher),
            consumer: Some(consumer),
        };
        let body = json!({
            "token": "t",
            "type": "event_callback",
            "event": {
                "type": "link_shared",
                "channel": "C1",
                "message_ts": "1.2",
                "links": [{"url": "https://a"}, {"url": "https://b"}, {"url": "https://c"}],
            },
        });
        let event: HttpEvent =
            serde_json::from_value(json!({"httpMethod": "POST", "body": body.to_string()}))
                .unwrap();

        let response = tokio::time::timeout(
            Duration::from_secs(5),
            dispatch_event(queue, Secret::new("t".into()), &event),
        )
        .await
        .expect("dispatch blocked on a full memory queue")
        .unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "OK");
    }

    #[tokio::test]
    async fn dispatch_event_without_consumer_answers_rejections() {
        let (publisher, _consumer) = unfurler_queue::memory::channel(1);
        let queue = QueueHandle {
            publisher: Arc::new(publisher),
            consumer: None,
        };
        let event: HttpEvent = serde_json::from_value(json!({"httpMethod": "GET"})).unwrap();
        let response = dispatch_event(queue, Secret::new("t".into()), &event)
            .await
            .unwrap();
        assert_eq!(response.status_code, 405);
    }

    #[test]
    fn pubsub_push_envelope_is_detected() {
        let raw = r#"{"message":{"data":"aHR0cHM6Ly9h","attributes":{"ts":"1","channel":"C"},"messageId":"9"}}"#;
        let requests = delivery_requests(DeliveryFormat::Pubsub, raw, Some("ignored")).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message_id.as_deref(), Some("9"));
        assert_eq!(requests[0].link.as_deref(), Some("https://a"));
    }

    #[test]
    fn pubsub_background_message_uses_event_id() {
        let raw = r#"{"data":"aHR0cHM6Ly9h","attributes":{"ts":"1","channel":"C"}}"#;
        let requests = delivery_requests(DeliveryFormat::Pubsub, raw, Some("evt-1")).unwrap();
        assert_eq!(requests[0].message_id.as_deref(), Some("evt-1"));
        assert_eq!(requests[0].channel.as_deref(), Some("C"));
    }

    #[test]
    fn sns_records_are_expanded() {
        let raw = r#"{"Records":[{"Sns":{"MessageId":"a","Message":"https://a"}},{"Sns":{"MessageId":"b"}}]}"#;
        let requests = delivery_requests(DeliveryFormat::Sns, raw, None).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].link, None);
    }

    #[test]
    fn malformed_delivery_is_an_error() {
        assert!(delivery_requests(DeliveryFormat::Sns, "not json", None).is_err());
    }
}
