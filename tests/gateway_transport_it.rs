// std
use std::{
	collections::VecDeque,
	sync::{Arc, Mutex},
};
// self
use auth_gateway::{
	auth::{TokenKind, TokenSecret},
	endpoint::Endpoints,
	gateway::Gateway,
	http::{Transport, TransportFuture},
	request::{RequestDescriptor, RequestOutcome},
	store::{CredentialStore, MemoryStore, StoreAttributes},
	url::Url,
};

/// Replays a scripted outcome per dispatch and records every descriptor it was handed,
/// after header merging and bearer attachment.
#[derive(Default)]
struct SequencedTransport {
	script: Mutex<VecDeque<RequestOutcome>>,
	seen: Mutex<Vec<RequestDescriptor>>,
}
impl SequencedTransport {
	fn scripted(outcomes: impl IntoIterator<Item = RequestOutcome>) -> Self {
		Self { script: Mutex::new(outcomes.into_iter().collect()), seen: Mutex::new(Vec::new()) }
	}

	fn seen(&self) -> Vec<RequestDescriptor> {
		self.seen.lock().expect("Descriptor log mutex should not be poisoned.").clone()
	}
}
impl Transport for SequencedTransport {
	fn send(&self, descriptor: RequestDescriptor) -> TransportFuture<'_> {
		self.seen.lock().expect("Descriptor log mutex should not be poisoned.").push(descriptor);

		let outcome = self
			.script
			.lock()
			.expect("Script mutex should not be poisoned.")
			.pop_front()
			.expect("Transport was dispatched more often than the script allows.");

		Box::pin(async move { outcome })
	}
}

fn build_endpoints() -> Endpoints {
	Endpoints::from_base(Url::parse("https://api.example.test/").expect("Base URL should parse."))
		.expect("Endpoint set should build from the fixture base URL.")
}

async fn build_gateway(
	transport: SequencedTransport,
) -> (Gateway<SequencedTransport>, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();

	store_backend
		.set(TokenKind::Access, TokenSecret::new("stale-access"), StoreAttributes::default())
		.await
		.expect("Seeding the access slot should succeed.");
	store_backend
		.set(TokenKind::Refresh, TokenSecret::new("valid-refresh"), StoreAttributes::default())
		.await
		.expect("Seeding the refresh slot should succeed.");

	(Gateway::with_transport(store, build_endpoints(), transport), store_backend)
}

fn authorization_of(descriptor: &RequestDescriptor) -> Option<String> {
	descriptor
		.headers
		.get(http::header::AUTHORIZATION)
		.map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn unauthorized() -> RequestOutcome {
	RequestOutcome::Failure { status: Some(http::StatusCode::UNAUTHORIZED), body: None }
}

#[tokio::test]
async fn replay_carries_the_rotated_bearer_token() {
	let transport = SequencedTransport::scripted([
		unauthorized(),
		RequestOutcome::Success {
			status: http::StatusCode::OK,
			data: serde_json::json!({"access": "fresh-access"}),
		},
		RequestOutcome::Success { status: http::StatusCode::OK, data: serde_json::json!({}) },
	]);
	let (gateway, _store) = build_gateway(transport).await;
	let descriptor = RequestDescriptor::get(
		gateway.endpoints.api("cases").expect("Relative API path should resolve."),
	);
	let outcome =
		gateway.execute(descriptor).await.expect("Execute should not surface a local fault.");

	assert!(outcome.is_success());

	let seen = gateway.transport.seen();

	assert_eq!(seen.len(), 3, "First attempt, refresh exchange, and one replay are expected.");
	assert_eq!(authorization_of(&seen[0]), Some("Bearer stale-access".into()));
	assert_eq!(seen[1].url, gateway.endpoints.refresh);
	assert_eq!(seen[1].body, Some(serde_json::json!({"refresh": "valid-refresh"})));
	assert_eq!(authorization_of(&seen[2]), Some("Bearer fresh-access".into()));
	assert_eq!(seen[2].url, seen[0].url);
}

#[tokio::test]
async fn replay_after_failed_refresh_goes_out_unauthenticated() {
	let transport = SequencedTransport::scripted([
		unauthorized(),
		RequestOutcome::Failure { status: Some(http::StatusCode::UNAUTHORIZED), body: None },
		unauthorized(),
	]);
	let (gateway, store) = build_gateway(transport).await;
	let descriptor = RequestDescriptor::get(
		gateway.endpoints.api("cases").expect("Relative API path should resolve."),
	);
	let outcome =
		gateway.execute(descriptor).await.expect("Execute should not surface a local fault.");

	// The replay's 401 is returned verbatim; a second refresh is never attempted.
	assert_eq!(outcome, unauthorized());

	let seen = gateway.transport.seen();

	assert_eq!(seen.len(), 3, "No further dispatch may follow the replay's failure.");
	assert_eq!(
		authorization_of(&seen[2]),
		None,
		"The replay must reflect the cleared credential store.",
	);
	assert!(store.get(TokenKind::Access).await.expect("Access get should succeed.").is_none());
}

#[tokio::test]
async fn refresh_exchange_is_never_authenticated_with_the_stale_token() {
	let transport = SequencedTransport::scripted([
		unauthorized(),
		RequestOutcome::Success {
			status: http::StatusCode::OK,
			data: serde_json::json!({"access": "fresh-access"}),
		},
		RequestOutcome::Success { status: http::StatusCode::OK, data: serde_json::json!({}) },
	]);
	let (gateway, _store) = build_gateway(transport).await;
	let descriptor = RequestDescriptor::get(
		gateway.endpoints.api("cases").expect("Relative API path should resolve."),
	);

	gateway.execute(descriptor).await.expect("Execute should not surface a local fault.");

	let seen = gateway.transport.seen();

	assert_eq!(
		authorization_of(&seen[1]),
		None,
		"The refresh exchange authenticates with the refresh token in its body only.",
	);
}
