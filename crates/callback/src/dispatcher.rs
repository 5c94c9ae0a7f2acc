//! Platform-agnostic callback handling.

use std::sync::Arc;

use {
    futures::future::join_all,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::{debug, info, warn},
    unfurler_queue::Publisher,
};

use crate::{
    error::{CallbackError, DispatchError},
    events::{CallbackKind, EventKind, LinkSharedEvent},
    request::{CallbackRequest, Responder, ResponseBody},
};

/// Verifies, routes and fans out one callback at a time. Holds no mutable
/// state; a single instance serves every request.
#[derive(Clone)]
pub struct Dispatcher {
    verification_token: Secret<String>,
    publisher: Arc<dyn Publisher>,
}

impl Dispatcher {
    pub fn new(verification_token: Secret<String>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            verification_token,
            publisher,
        }
    }

    /// Handle one callback, answering through `responder`.
    ///
    /// Classified rejections are answered with their status unless a
    /// response has already gone out, in which case they are returned.
    /// Publish failures are always returned and never answered here.
    pub async fn handle(
        &self,
        request: &CallbackRequest,
        responder: &mut dyn Responder,
    ) -> Result<(), DispatchError> {
        match self.route(request, responder).await {
            Err(DispatchError::Rejected(err)) => reject(err, responder),
            other => other,
        }
    }

    async fn route(
        &self,
        request: &CallbackRequest,
        responder: &mut dyn Responder,
    ) -> Result<(), DispatchError> {
        if request.method != "POST" {
            return Err(CallbackError::method_not_allowed(&request.method).into());
        }
        let body = self.verify(request.body.as_ref())?;

        match CallbackKind::from_body(body)? {
            CallbackKind::UrlVerification => {
                debug!("answering url_verification challenge");
                responder.status(200);
                responder.send(challenge_body(body.get("challenge")));
            },
            CallbackKind::EventCallback => {
                let event = body.get("event");
                match EventKind::from_event(event)? {
                    EventKind::LinkShared => {
                        let event = LinkSharedEvent::from_value(event.unwrap_or(&Value::Null))?;
                        self.publish_links(&event).await?;
                    },
                }
                responder.status(200);
                responder.send(ResponseBody::Text("OK".into()));
            },
        }
        Ok(())
    }

    /// The token check runs before any routing, so a missing or non-object
    /// body is a verification failure.
    fn verify<'a>(&self, body: Option<&'a Value>) -> Result<&'a Value, CallbackError> {
        let expected = self.verification_token.expose_secret();
        let body = body.ok_or(CallbackError::Unauthorized)?;
        match body.get("token").and_then(Value::as_str) {
            Some(token) if !expected.is_empty() && token == expected => Ok(body),
            _ => Err(CallbackError::Unauthorized),
        }
    }

    /// Publish every link concurrently and wait for all of them. The first
    /// failure in link order is returned once every publish has settled.
    async fn publish_links(&self, event: &LinkSharedEvent) -> Result<(), DispatchError> {
        let ts = event.message_ts.as_deref().unwrap_or_default();
        let channel = event.channel.as_deref().unwrap_or_default();
        info!(
            backend = self.publisher.backend(),
            channel,
            ts,
            links = event.links.len(),
            "link_shared received"
        );

        let results = join_all(
            event
                .links
                .iter()
                .map(|link| self.publisher.publish(&link.url, ts, channel)),
        )
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!(failed, total = event.links.len(), channel, ts, "publishing shared links failed");
            return Err(err.into());
        }
        Ok(())
    }
}

fn challenge_body(challenge: Option<&Value>) -> ResponseBody {
    match challenge {
        None | Some(Value::Null) => ResponseBody::Text(String::new()),
        Some(Value::String(s)) => ResponseBody::Text(s.clone()),
        Some(other) => ResponseBody::Json(other.clone()),
    }
}

fn reject(err: CallbackError, responder: &mut dyn Responder) -> Result<(), DispatchError> {
    let status = err.status_code();
    if responder.headers_sent() {
        warn!(status, error = %err, "rejection after response was sent");
        return Err(err.into());
    }
    warn!(status, error = %err, "rejected callback");
    responder.status(status);
    responder.send(ResponseBody::Json(json!({
        "error": err.to_string(),
        "code": status,
    })));
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        super::*, crate::request::ResponseRecorder, async_trait::async_trait, rstest::rstest,
        unfurler_queue::Error as QueueError,
    };

    const TOKEN: &str = "verification-token";

    /// Records every publish; fails the ones whose link contains `fail`.
    #[derive(Default)]
    struct FakePublisher {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakePublisher {
        fn calls(&self) -> Vec<(String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        fn backend(&self) -> &'static str {
            "fake"
        }

        async fn publish(&self, link: &str, ts: &str, channel: &str) -> unfurler_queue::Result<String> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((link.into(), ts.into(), channel.into()));
                calls.len()
            };
            if link.contains("fail") {
                return Err(QueueError::Http {
                    backend: "fake",
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(format!("msg-{n}"))
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<FakePublisher>) {
        let publisher = Arc::new(FakePublisher::default());
        let dispatcher = Dispatcher::new(Secret::new(TOKEN.into()), publisher.clone());
        (dispatcher, publisher)
    }

    async fn run(
        dispatcher: &Dispatcher,
        method: &str,
        body: Value,
    ) -> (Result<(), DispatchError>, ResponseRecorder) {
        let mut recorder = ResponseRecorder::new();
        let request = CallbackRequest::new(method, Some(body));
        let result = dispatcher.handle(&request, &mut recorder).await;
        (result, recorder)
    }

    fn link_shared(links: &[&str]) -> Value {
        json!({
            "token": TOKEN,
            "type": "event_callback",
            "event": {
                "type": "link_shared",
                "channel": "C024BE91L",
                "message_ts": "1519000000.000100",
                "links": links
                    .iter()
                    .map(|url| json!({"url": url, "domain": "v1host.com"}))
                    .collect::<Vec<_>>(),
            }
        })
    }

    #[rstest]
    #[case("GET")]
    #[case("PUT")]
    #[case("DELETE")]
    #[case("post")]
    #[case("Post")]
    #[tokio::test]
    async fn non_post_is_405_without_publishing(#[case] method: &str) {
        let (dispatcher, publisher) = dispatcher();
        let (result, recorder) = run(&dispatcher, method, link_shared(&["https://a"])).await;
        result.unwrap();
        assert_eq!(recorder.status_code(), 405);
        assert!(publisher.calls().is_empty());
    }

    #[rstest]
    #[case(json!({"token": "wrong", "type": "url_verification", "challenge": "c"}))]
    #[case(json!({"token": "wrong", "type": "event_callback"}))]
    #[case(json!({"token": "wrong", "type": "nonsense"}))]
    #[case(json!({"type": "url_verification", "challenge": "c"}))]
    #[case(json!({"token": 1}))]
    #[case(json!("just a string"))]
    #[tokio::test]
    async fn token_mismatch_is_401_regardless_of_type(#[case] body: Value) {
        let (dispatcher, publisher) = dispatcher();
        let (result, recorder) = run(&dispatcher, "POST", body).await;
        result.unwrap();
        let (status, body) = recorder.into_parts();
        assert_eq!(status, 401);
        assert_eq!(
            body,
            ResponseBody::Json(json!({"error": "verification token mismatch", "code": 401}))
        );
        assert!(publisher.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_body_is_401() {
        let (dispatcher, _) = dispatcher();
        let mut recorder = ResponseRecorder::new();
        dispatcher
            .handle(&CallbackRequest::new("POST", None), &mut recorder)
            .await
            .unwrap();
        assert_eq!(recorder.status_code(), 401);
    }

    #[tokio::test]
    async fn empty_configured_token_rejects_everything() {
        let dispatcher = Dispatcher::new(Secret::new(String::new()), Arc::new(FakePublisher::default()));
        let (_, recorder) = run(
            &dispatcher,
            "POST",
            json!({"token": "", "type": "url_verification", "challenge": "c"}),
        )
        .await;
        assert_eq!(recorder.status_code(), 401);
    }

    #[rstest]
    #[case(json!("3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"), "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P")]
    #[case(json!("  spaced <&> "), "  spaced <&> ")]
    #[case(json!(12345), "12345")]
    #[case(Value::Null, "")]
    #[tokio::test]
    async fn url_verification_echoes_challenge(#[case] challenge: Value, #[case] expected: &str) {
        let (dispatcher, _) = dispatcher();
        let (result, recorder) = run(
            &dispatcher,
            "POST",
            json!({"token": TOKEN, "type": "url_verification", "challenge": challenge}),
        )
        .await;
        result.unwrap();
        let (status, body) = recorder.into_parts();
        assert_eq!(status, 200);
        assert_eq!(body.render(), expected);
    }

    #[tokio::test]
    async fn unknown_callback_type_is_400_naming_it() {
        let (dispatcher, _) = dispatcher();
        let (_, recorder) = run(&dispatcher, "POST", json!({"token": TOKEN, "type": "app_rate_limited"})).await;
        let (status, body) = recorder.into_parts();
        assert_eq!(status, 400);
        assert!(body.render().contains("app_rate_limited"));
    }

    #[tokio::test]
    async fn unknown_event_type_is_400() {
        let (dispatcher, publisher) = dispatcher();
        let (_, recorder) = run(
            &dispatcher,
            "POST",
            json!({"token": TOKEN, "type": "event_callback", "event": {"type": "message"}}),
        )
        .await;
        let (status, body) = recorder.into_parts();
        assert_eq!(status, 400);
        assert!(body.render().contains("unsupported event type: message"));
        assert!(publisher.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_event_is_400() {
        let (dispatcher, _) = dispatcher();
        let (_, recorder) = run(&dispatcher, "POST", json!({"token": TOKEN, "type": "event_callback"})).await;
        assert_eq!(recorder.status_code(), 400);
    }

    #[rstest]
    #[case(&[])]
    #[case(&["https://www1.v1host.com/sample/story.mvc/Summary?oidToken=Story%3A1"])]
    #[case(&["https://a", "https://b", "https://a"])]
    #[tokio::test]
    async fn publishes_each_link_once(#[case] links: &[&str]) {
        let (dispatcher, publisher) = dispatcher();
        let (result, recorder) = run(&dispatcher, "POST", link_shared(links)).await;
        result.unwrap();

        let (status, body) = recorder.into_parts();
        assert_eq!(status, 200);
        assert_eq!(body, ResponseBody::Text("OK".into()));

        let mut calls = publisher.calls();
        calls.sort();
        let mut expected: Vec<_> = links
            .iter()
            .map(|url| (url.to_string(), "1519000000.000100".to_string(), "C024BE91L".to_string()))
            .collect();
        expected.sort();
        assert_eq!(calls, expected);
    }

    #[tokio::test]
    async fn absent_links_is_ok() {
        let (dispatcher, publisher) = dispatcher();
        let (result, recorder) = run(
            &dispatcher,
            "POST",
            json!({"token": TOKEN, "type": "event_callback", "event": {"type": "link_shared", "channel": "C1"}}),
        )
        .await;
        result.unwrap();
        assert_eq!(recorder.into_parts(), (200, ResponseBody::Text("OK".into())));
        assert!(publisher.calls().is_empty());
    }

    #[tokio::test]
    async fn any_publish_failure_fails_the_request_after_all_settle() {
        let (dispatcher, publisher) = dispatcher();
        let (result, recorder) = run(
            &dispatcher,
            "POST",
            link_shared(&["https://ok-1", "https://fail", "https://ok-2"]),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DispatchError::Publish(QueueError::Http { status: 503, .. })));
        assert!(!recorder.headers_sent());
        assert_eq!(publisher.calls().len(), 3);
    }

    #[tokio::test]
    async fn missing_ts_and_channel_publish_empty_strings() {
        let (dispatcher, publisher) = dispatcher();
        let (result, _) = run(
            &dispatcher,
            "POST",
            json!({
                "token": TOKEN,
                "type": "event_callback",
                "event": {"type": "link_shared", "links": [{"url": "https://a"}]}
            }),
        )
        .await;
        result.unwrap();
        assert_eq!(publisher.calls(), vec![("https://a".to_string(), String::new(), String::new())]);
    }

    /// Responder that claims a response already went out.
    struct AlreadySent;

    impl Responder for AlreadySent {
        fn headers_sent(&self) -> bool {
            true
        }

        fn status(&mut self, _code: u16) {
            panic!("status set after response was sent");
        }

        fn send(&mut self, _body: ResponseBody) {
            panic!("second response sent");
        }
    }

    #[tokio::test]
    async fn rejection_after_send_is_returned_not_resent() {
        let (dispatcher, _) = dispatcher();
        let request = CallbackRequest::new("GET", None);
        let err = dispatcher.handle(&request, &mut AlreadySent).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rejected(CallbackError::MethodNotAllowed { .. })
        ));
    }
}
