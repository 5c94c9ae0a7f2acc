#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests driving the gateway over HTTP.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD},
    mockito::{Matcher, Server},
    secrecy::Secret,
    serde_json::{Value, json},
    tokio::net::TcpListener,
};

use {
    unfurler_callback::Dispatcher,
    unfurler_config::{ServerConfig, UnfurlerConfig},
    unfurler_gateway::{AppState, build_app, spawn_consumer},
    unfurler_queue::Publisher,
    unfurler_worker::UnfurlWorker,
};

const TOKEN: &str = "verification-token";

fn config(v1: &Server, slack: &Server) -> UnfurlerConfig {
    let mut config = UnfurlerConfig::default();
    config.slack.verification_token = Secret::new(TOKEN.into());
    config.slack.oauth_token = Secret::new("xoxb-test".into());
    config.slack.api_base = slack.url();
    config.versionone.base_url = v1.url();
    config.versionone.username = "admin".into();
    config.versionone.password = Secret::new("secret".into());
    config
}

async fn serve(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(state, &ServerConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Gateway wired to the memory queue with its consumer running.
async fn start_memory_gateway(config: &UnfurlerConfig) -> SocketAddr {
    let http = reqwest::Client::new();
    let queue = unfurler_queue::from_config(&config.queue, http.clone()).unwrap();
    let worker = UnfurlWorker::from_config(config, http);
    spawn_consumer(queue.consumer.unwrap(), worker.clone());
    serve(AppState {
        dispatcher: Dispatcher::new(config.slack.verification_token.clone(), queue.publisher),
        worker,
        backend: "memory",
    })
    .await
}

struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn publish(&self, _link: &str, _ts: &str, _channel: &str) -> unfurler_queue::Result<String> {
        Err(unfurler_queue::Error::Closed)
    }
}

fn link_shared(link: &str) -> Value {
    json!({
        "token": TOKEN,
        "type": "event_callback",
        "event": {
            "type": "link_shared",
            "channel": "C024BE91L",
            "message_ts": "1519000000.000100",
            "links": [{"url": link, "domain": "v1host.com"}]
        }
    })
}

async fn post_callback(addr: SocketAddr, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/slack/events"))
        .json(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_reports_queue_backend() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue"], "memory");
}

#[tokio::test]
async fn callback_rejects_get_with_405() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;

    let resp = reqwest::get(format!("http://{addr}/slack/events")).await.unwrap();
    assert_eq!(resp.status(), 405);
}

#[tokio::test]
async fn callback_rejects_bad_token_with_401() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;

    let resp = post_callback(addr, &json!({"token": "nope", "type": "url_verification"})).await;
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn callback_rejects_non_json_body_with_401() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/slack/events"))
        .body("token=abc&type=url_verification")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn url_verification_echoes_challenge() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;

    let resp = post_callback(
        addr,
        &json!({"token": TOKEN, "type": "url_verification", "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"
    );
}

#[tokio::test]
async fn shared_link_is_unfurled_through_memory_queue() {
    let mut v1 = Server::new_async().await;
    let mut slack = Server::new_async().await;
    let link = format!("{}/story.mvc/Summary?oidToken=Story:55555", v1.url());

    let _fetch = v1
        .mock("GET", "/rest-1.v1/Data/Story/55555")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            json!({"Attributes": {"Number": {"value": "55555"}, "Name": {"value": "Login bug"}}})
                .to_string(),
        )
        .create_async()
        .await;
    let post = slack
        .mock("POST", "/chat.unfurl")
        .match_body(Matcher::PartialJson(json!({
            "channel": "C024BE91L",
            "unfurls": {link.as_str(): {"title": "55555", "text": "Login bug"}}
        })))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let addr = start_memory_gateway(&config(&v1, &slack)).await;
    let resp = post_callback(addr, &link_shared(&link)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    // The consumer runs in the background.
    let mut posted = false;
    for _ in 0..100 {
        if post.matched_async().await {
            posted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(posted, "unfurl was never posted");
}

#[tokio::test]
async fn publish_failure_is_500() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let config = config(&v1, &slack);
    let addr = serve(AppState {
        dispatcher: Dispatcher::new(
            config.slack.verification_token.clone(),
            Arc::new(FailingPublisher),
        ),
        worker: UnfurlWorker::from_config(&config, reqwest::Client::new()),
        backend: "failing",
    })
    .await;

    let resp = post_callback(addr, &link_shared("https://v1.example.com/x")).await;
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn push_endpoint_acknowledges_no_data() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/queue/pubsub"))
        .json(&json!({"message": {"messageId": "1"}, "subscription": "s"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn push_endpoint_acknowledges_undecodable_bodies() {
    let (v1, slack) = (Server::new_async().await, Server::new_async().await);
    let addr = start_memory_gateway(&config(&v1, &slack)).await;
    let client = reqwest::Client::new();

    for body in ["not json", r#"{"message": "wrong type"}"#, ""] {
        let resp = client
            .post(format!("http://{addr}/queue/pubsub"))
            .header("content-type", "text/plain")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204, "{body}");
    }
}

#[tokio::test]
async fn push_endpoint_fails_on_lookup_error() {
    let mut v1 = Server::new_async().await;
    let mut slack = Server::new_async().await;
    let link = format!("{}/story.mvc/Summary?oidToken=Story:55555", v1.url());
    let _fetch = v1
        .mock("GET", "/rest-1.v1/Data/Story/55555")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;
    let post = slack.mock("POST", Matcher::Any).expect(0).create_async().await;

    let addr = start_memory_gateway(&config(&v1, &slack)).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/queue/pubsub"))
        .json(&json!({
            "message": {
                "data": STANDARD.encode(&link),
                "attributes": {"ts": "1.1", "channel": "C1"},
                "messageId": "2"
            }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    post.assert_async().await;
}
