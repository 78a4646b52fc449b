// std
use std::{collections::VecDeque, io};
// crates.io
use http::Response;
use tokio_util::sync::CancellationToken;
// self
use bru_api::{
	_preludet::*,
	auth,
	cache::TokenCache,
	client::{Client, Method, RetryPolicy},
	error::{AuthError, TransportError},
	http::{Transport, TransportFuture, WireRequest},
	sign::{self, Params},
};

const ACCOUNT: &str = "teahouse";
const APP_ID: u32 = 42;

fn token() -> String {
	"t".repeat(32)
}

fn secret() -> String {
	"s".repeat(32)
}

fn payload(value: serde_json::Value) -> Payload {
	value.as_object().expect("Fixture must be a JSON object.").clone()
}

fn test_policy() -> RetryPolicy {
	RetryPolicy { poll_interval: Duration::from_millis(10), deadline: Duration::from_millis(200) }
}

enum Scripted {
	Reply(u16, String),
	NetworkError,
}

/// Transport replaying a scripted sequence of responses while recording request URIs.
///
/// Unscripted attempts are answered with 503 so deadline tests can run open-ended.
#[derive(Default)]
struct FakeTransport {
	script: Mutex<VecDeque<Scripted>>,
	requests: Mutex<Vec<String>>,
}
impl FakeTransport {
	fn scripted(steps: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
		Arc::new(Self { script: Mutex::new(steps.into_iter().collect()), requests: <_>::default() })
	}

	fn requests(&self) -> Vec<String> {
		self.requests.lock().clone()
	}
}
impl Transport for FakeTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_> {
		self.requests.lock().push(request.uri().to_string());

		let step = self.script.lock().pop_front();

		Box::pin(async move {
			match step {
				Some(Scripted::Reply(status, body)) => Ok(Response::builder()
					.status(status)
					.body(body.into_bytes())
					.expect("Scripted response should build.")),
				Some(Scripted::NetworkError) => Err(TransportError::Io(io::Error::new(
					io::ErrorKind::ConnectionReset,
					"connection reset",
				))),
				None => Ok(Response::builder()
					.status(503)
					.body(Vec::new())
					.expect("Fallback response should build.")),
			}
		})
	}
}

async fn build_client(
	transport: Arc<FakeTransport>,
	sleepy: bool,
) -> (Client<FakeTransport>, Arc<MemoryCache>) {
	let cache_backend = Arc::new(MemoryCache::default());
	let cache: Arc<dyn TokenCache> = cache_backend.clone();

	cache
		.set(&auth::cache_key(ACCOUNT, APP_ID), &token())
		.await
		.expect("Failed to seed cache with fixture token.");

	let client = Client::builder(ACCOUNT, APP_ID, secret())
		.sleepy(sleepy)
		.cache(cache)
		.transport(transport)
		.retry_policy(test_policy())
		.build()
		.expect("Failed to build test client.");

	(client, cache_backend)
}

#[tokio::test]
async fn expired_token_rotates_once_and_replays() {
	let rotated = "u".repeat(32);
	let transport = FakeTransport::scripted([
		Scripted::Reply(401, String::new()),
		Scripted::Reply(
			200,
			serde_json::json!({ "status": "ok", "token": rotated.clone() }).to_string(),
		),
		Scripted::Reply(
			200,
			signed_body(&rotated, &secret(), payload(serde_json::json!({ "status": "ok" }))),
		),
	]);
	let (client, cache) = build_client(transport.clone(), false).await;
	let result = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect("Rotation should recover from a single 401.");

	assert_eq!(result, payload(serde_json::json!({ "status": "ok" })));

	let requests = transport.requests();

	assert_eq!(requests.len(), 3);
	assert!(requests[0].contains("/api/rest/sale.json"));
	assert!(requests[0].contains(&sign::request_signature(&token(), &secret(), "app_id=42")));
	assert!(requests[1].contains("/api/rest/repair.json"));
	assert!(requests[2].contains("/api/rest/sale.json"));
	assert!(requests[2].contains(&sign::request_signature(&rotated, &secret(), "app_id=42")));
	assert_eq!(cache.peek(&auth::cache_key(ACCOUNT, APP_ID)), Some(rotated));
}

#[tokio::test]
async fn second_rejection_after_rotation_is_fatal() {
	let rotated = "u".repeat(32);
	let transport = FakeTransport::scripted([
		Scripted::Reply(401, String::new()),
		Scripted::Reply(200, serde_json::json!({ "status": "ok", "token": rotated }).to_string()),
		Scripted::Reply(401, String::new()),
	]);
	let (client, _cache) = build_client(transport.clone(), false).await;
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("A second 401 after rotation should be fatal.");

	assert!(matches!(err, Error::Auth(AuthError::TokenRejected)));
	assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn rate_limit_surfaces_immediately_without_sleepy() {
	let transport = FakeTransport::scripted([Scripted::Reply(503, String::new())]);
	let (client, _cache) = build_client(transport.clone(), false).await;
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("A 503 should surface when the client is not sleepy.");

	assert!(matches!(err, Error::RateLimited));
	assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn sleepy_client_polls_through_rate_limits() {
	let transport = FakeTransport::scripted([
		Scripted::Reply(503, String::new()),
		Scripted::Reply(503, String::new()),
		Scripted::Reply(503, String::new()),
		Scripted::Reply(
			200,
			signed_body(&token(), &secret(), payload(serde_json::json!({ "status": "ok" }))),
		),
	]);
	let (client, _cache) = build_client(transport.clone(), true).await;
	let result = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect("Sleepy client should poll until the limit clears.");

	assert_eq!(result, payload(serde_json::json!({ "status": "ok" })));
	assert_eq!(transport.requests().len(), 4);
}

#[tokio::test]
async fn sleepy_client_gives_up_at_the_deadline() {
	// Empty script; every attempt falls back to 503.
	let transport = FakeTransport::scripted([]);
	let (client, _cache) = build_client(transport.clone(), true).await;
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("Endless 503s should exhaust the polling deadline.");

	assert!(matches!(err, Error::DeadlineExceeded));
	assert!(transport.requests().len() > 1);
}

#[tokio::test]
async fn cancellation_interrupts_the_poll_sleep() {
	let transport = FakeTransport::scripted([]);
	let cache_backend = Arc::new(MemoryCache::default());
	let cache: Arc<dyn TokenCache> = cache_backend.clone();

	cache
		.set(&auth::cache_key(ACCOUNT, APP_ID), &token())
		.await
		.expect("Failed to seed cache with fixture token.");

	let cancellation = CancellationToken::new();
	let client: Client<FakeTransport> = Client::builder(ACCOUNT, APP_ID, secret())
		.sleepy(true)
		.cache(cache)
		.transport(transport)
		.retry_policy(RetryPolicy {
			poll_interval: Duration::from_secs(30),
			deadline: Duration::from_secs(300),
		})
		.cancellation(cancellation.clone())
		.build()
		.expect("Failed to build test client.");
	let canceller = cancellation.clone();
	let _abort = tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(30)).await;
		canceller.cancel();
	});
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("Cancellation should interrupt the poll sleep.");

	assert!(matches!(err, Error::Cancelled));
}

#[tokio::test]
async fn transport_errors_bypass_classification() {
	let transport = FakeTransport::scripted([Scripted::NetworkError]);
	let (client, _cache) = build_client(transport.clone(), true).await;
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("A transport failure should surface without retries.");

	assert!(matches!(err, Error::Transport(TransportError::Io(_))));
	assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn unexpected_status_surfaces_verbatim() {
	let transport = FakeTransport::scripted([Scripted::Reply(404, String::new())]);
	let (client, _cache) = build_client(transport.clone(), false).await;
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("A 404 should surface as an HTTP error.");

	assert!(matches!(err, Error::Http { status: 404 }));
}

#[tokio::test]
async fn tampered_signature_is_rejected_without_retry() {
	// Signed against the wrong token, so verification against the real one must fail.
	let transport = FakeTransport::scripted([Scripted::Reply(
		200,
		signed_body(&"x".repeat(32), &secret(), payload(serde_json::json!({ "status": "ok" }))),
	)]);
	let (client, _cache) = build_client(transport.clone(), true).await;
	let err = client
		.request(Method::Get, "sale", Params::new())
		.await
		.expect_err("A bad response signature should be fatal.");

	assert!(matches!(err, Error::AuthMismatch));
	assert_eq!(transport.requests().len(), 1);
}
