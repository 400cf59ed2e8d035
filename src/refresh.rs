//! Single-flight refresh coordination.
//!
//! The coordinator owns the process-wide refresh lock: the first caller to observe a 401
//! acquires it and performs one refresh exchange; every caller that observes a 401 while
//! the lock is held waits for the release and replays without refreshing on its own. The
//! lock is released on every path (success, rejection, or missing refresh token) before
//! control returns, so no caller can starve.
//!
//! The coordinator is an injectable value, not a module-level singleton; tests instantiate
//! isolated coordinators per case.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind},
	http::Transport,
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{RequestDescriptor, RequestOutcome},
	store::{CredentialStore, StoreAttributes},
};

/// How a coordinated refresh settled, from the perspective of one caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshSignal {
	/// This caller held the lock and obtained fresh credentials.
	Refreshed,
	/// This caller held the lock and the refresh exchange failed; both tokens were
	/// cleared. The original call is still replayed once so the backend's verdict reaches
	/// the caller.
	Failed,
	/// This caller held the lock but no refresh token exists to exchange. The original
	/// call must not be replayed.
	Missing,
	/// Another caller held the lock; it has since released it. The outcome of that refresh
	/// is not propagated; the caller simply replays against whatever the store now holds.
	Settled,
}

/// Mutex-guarded coordinator ensuring at most one refresh exchange is in flight.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	guard: AsyncMutex<()>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the coordinator's refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Coordinates one refresh on behalf of a caller that just observed a 401.
	///
	/// Exactly one concurrent caller becomes the lock holder and dispatches the refresh
	/// exchange; the rest block until the lock releases and receive
	/// [`RefreshSignal::Settled`] without learning the holder's outcome.
	pub async fn coordinate<T>(
		&self,
		transport: &T,
		store: &dyn CredentialStore,
		refresh_url: &Url,
	) -> Result<RefreshSignal>
	where
		T: ?Sized + Transport,
	{
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "coordinate");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Some(_holder) = self.guard.try_lock() else {
					self.metrics.record_wait();
					drop(self.guard.lock().await);

					return Ok(RefreshSignal::Settled);
				};
				let Some(refresh_token) = store.get(TokenKind::Refresh).await? else {
					self.metrics.record_failure();

					return Ok(RefreshSignal::Missing);
				};

				self.metrics.record_attempt();

				let descriptor = RequestDescriptor::post(
					refresh_url.clone(),
					serde_json::json!({ "refresh": refresh_token.expose() }),
				);
				let outcome = transport.send(descriptor).await;
				let status = outcome.status().map(|code| code.as_u16());
				let pair = match outcome {
					RequestOutcome::Success { data, .. } => CredentialPair::from_grant(data, status)
						.map_err(|err| {
							self.metrics.record_failure();

							Error::from(err)
						})?,
					RequestOutcome::Failure { .. } => {
						store.clear(TokenKind::Access).await?;
						store.clear(TokenKind::Refresh).await?;
						self.metrics.record_failure();

						return Ok(RefreshSignal::Failed);
					},
				};

				store.set(TokenKind::Access, pair.access, StoreAttributes::default()).await?;

				if let Some(rotated) = pair.refresh {
					store.set(TokenKind::Refresh, rotated, StoreAttributes::default()).await?;
				}

				self.metrics.record_success();

				Ok(RefreshSignal::Refreshed)
			})
			.await;

		match &result {
			Ok(RefreshSignal::Refreshed | RefreshSignal::Settled) =>
				obs::record_call_outcome(KIND, CallOutcome::Success),
			_ => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Runs an operation while holding the refresh lock.
	///
	/// Logout uses this so it never clears credentials underneath an in-flight refresh.
	pub async fn run_exclusive<F, Fut, R>(&self, operation: F) -> R
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = R>,
	{
		let _holder = self.guard.lock().await;

		operation().await
	}

	/// Waits until no refresh is in flight.
	pub async fn wait_for_unlock(&self) {
		drop(self.guard.lock().await);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU64, Ordering};
	// self
	use super::*;
	use crate::{
		auth::TokenSecret,
		http::TransportFuture,
		request::RequestOutcome,
		store::MemoryStore,
	};

	struct ScriptedTransport {
		outcome: RequestOutcome,
		calls: AtomicU64,
		last_descriptor: Mutex<Option<RequestDescriptor>>,
		delay: Option<std::time::Duration>,
	}
	impl ScriptedTransport {
		fn new(outcome: RequestOutcome) -> Self {
			Self {
				outcome,
				calls: AtomicU64::new(0),
				last_descriptor: Mutex::new(None),
				delay: None,
			}
		}

		fn delayed(outcome: RequestOutcome, delay: std::time::Duration) -> Self {
			Self { delay: Some(delay), ..Self::new(outcome) }
		}

		fn calls(&self) -> u64 {
			self.calls.load(Ordering::Relaxed)
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, descriptor: RequestDescriptor) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::Relaxed);
			*self.last_descriptor.lock() = Some(descriptor);

			Box::pin(async move {
				if let Some(delay) = self.delay {
					tokio::time::sleep(delay).await;
				}

				self.outcome.clone()
			})
		}
	}

	fn refresh_url() -> Url {
		Url::parse("https://api.example.test/token/refresh").expect("Fixture URL should parse.")
	}

	async fn seeded_store(access: &str, refresh: &str) -> MemoryStore {
		let store = MemoryStore::default();

		store
			.set(TokenKind::Access, TokenSecret::new(access), StoreAttributes::default())
			.await
			.expect("Seeding the access slot should succeed.");
		store
			.set(TokenKind::Refresh, TokenSecret::new(refresh), StoreAttributes::default())
			.await
			.expect("Seeding the refresh slot should succeed.");

		store
	}

	#[tokio::test]
	async fn lock_holder_writes_fresh_credentials() {
		let store = seeded_store("stale-access", "valid-refresh").await;
		let transport = ScriptedTransport::new(RequestOutcome::Success {
			status: http::StatusCode::OK,
			data: serde_json::json!({"access": "fresh-access", "refresh": "fresh-refresh"}),
		});
		let coordinator = RefreshCoordinator::new();
		let signal = coordinator
			.coordinate(&transport, &store, &refresh_url())
			.await
			.expect("Coordination should not surface a local fault.");

		assert_eq!(signal, RefreshSignal::Refreshed);
		assert_eq!(transport.calls(), 1);

		let access = store
			.get(TokenKind::Access)
			.await
			.expect("Access get should succeed.")
			.expect("Access secret should be present after refresh.");

		assert_eq!(access.expose(), "fresh-access");

		let sent = transport
			.last_descriptor
			.lock()
			.clone()
			.expect("Refresh exchange should have dispatched a descriptor.");

		assert_eq!(sent.body, Some(serde_json::json!({"refresh": "valid-refresh"})));
		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn unrotated_refresh_token_is_kept() {
		let store = seeded_store("stale-access", "keep-me").await;
		let transport = ScriptedTransport::new(RequestOutcome::Success {
			status: http::StatusCode::OK,
			data: serde_json::json!({"access": "fresh-access"}),
		});
		let coordinator = RefreshCoordinator::new();

		coordinator
			.coordinate(&transport, &store, &refresh_url())
			.await
			.expect("Coordination should not surface a local fault.");

		let refresh = store
			.get(TokenKind::Refresh)
			.await
			.expect("Refresh get should succeed.")
			.expect("Unrotated refresh token should survive the exchange.");

		assert_eq!(refresh.expose(), "keep-me");
	}

	#[tokio::test]
	async fn missing_refresh_token_reports_without_dispatch() {
		let store = MemoryStore::default();
		let transport = ScriptedTransport::new(RequestOutcome::Success {
			status: http::StatusCode::OK,
			data: serde_json::json!({"access": "never-used"}),
		});
		let coordinator = RefreshCoordinator::new();
		let signal = coordinator
			.coordinate(&transport, &store, &refresh_url())
			.await
			.expect("Coordination should not surface a local fault.");

		assert_eq!(signal, RefreshSignal::Missing);
		assert_eq!(transport.calls(), 0);
		assert_eq!(coordinator.metrics().failures(), 1);
		assert_eq!(coordinator.metrics().attempts(), 0);
	}

	#[tokio::test]
	async fn rejected_refresh_clears_both_slots() {
		let store = seeded_store("stale-access", "revoked-refresh").await;
		let transport = ScriptedTransport::new(RequestOutcome::Failure {
			status: Some(http::StatusCode::UNAUTHORIZED),
			body: None,
		});
		let coordinator = RefreshCoordinator::new();
		let signal = coordinator
			.coordinate(&transport, &store, &refresh_url())
			.await
			.expect("Coordination should not surface a local fault.");

		assert_eq!(signal, RefreshSignal::Failed);
		assert!(
			store.get(TokenKind::Access).await.expect("Access get should succeed.").is_none()
		);
		assert!(
			store.get(TokenKind::Refresh).await.expect("Refresh get should succeed.").is_none()
		);
	}

	#[tokio::test]
	async fn network_failure_is_treated_like_rejection() {
		let store = seeded_store("stale-access", "unreachable-refresh").await;
		let transport = ScriptedTransport::new(RequestOutcome::Failure { status: None, body: None });
		let coordinator = RefreshCoordinator::new();
		let signal = coordinator
			.coordinate(&transport, &store, &refresh_url())
			.await
			.expect("Coordination should not surface a local fault.");

		assert_eq!(signal, RefreshSignal::Failed);
		assert!(
			store.get(TokenKind::Refresh).await.expect("Refresh get should succeed.").is_none()
		);
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_exchange() {
		let store = seeded_store("stale-access", "shared-refresh").await;
		let transport = ScriptedTransport::delayed(
			RequestOutcome::Success {
				status: http::StatusCode::OK,
				data: serde_json::json!({"access": "shared-access"}),
			},
			std::time::Duration::from_millis(20),
		);
		let coordinator = RefreshCoordinator::new();
		let url = refresh_url();
		let (first, second) = tokio::join!(
			coordinator.coordinate(&transport, &store, &url),
			coordinator.coordinate(&transport, &store, &url),
		);
		let first = first.expect("First coordination should not surface a local fault.");
		let second = second.expect("Second coordination should not surface a local fault.");

		assert_eq!(transport.calls(), 1);
		assert!(
			matches!(
				(first, second),
				(RefreshSignal::Refreshed, RefreshSignal::Settled)
					| (RefreshSignal::Settled, RefreshSignal::Refreshed)
			),
			"Exactly one caller should refresh while the other settles: {first:?}/{second:?}.",
		);
		assert_eq!(coordinator.metrics().waits(), 1);
	}
}
