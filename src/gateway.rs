//! The authenticated request gateway, the single entry point used by all outbound calls.

// crates.io
use http::{HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, TokenKind, TokenSecret},
	endpoint::Endpoints,
	error::{ConfigError, ExchangeError},
	http::Transport,
	obs::{self, CallKind, CallOutcome, CallSpan},
	refresh::{RefreshCoordinator, RefreshMetrics, RefreshSignal},
	request::{RequestDescriptor, RequestOutcome},
	store::{CredentialStore, StoreAttributes},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Composes the transport, credential store, and refresh coordinator into one entry point.
///
/// Every outbound call goes through [`Gateway::execute`]: the access token is attached at
/// send time, a first-attempt 401 triggers one coordinated refresh, and the call is
/// replayed exactly once with whatever the store holds afterwards. Login and logout are
/// the only other writers of the credential slots, and both take the refresh lock so no
/// write ever races an in-flight refresh.
#[derive(Clone)]
pub struct Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Credential store holding the two token slots.
	pub store: Arc<dyn CredentialStore>,
	/// Resolved endpoint set.
	pub endpoints: Endpoints,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Creates a gateway that reuses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn CredentialStore>,
		endpoints: Endpoints,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			endpoints,
			coordinator: Arc::new(RefreshCoordinator::new()),
		}
	}

	/// Replaces the refresh coordinator, e.g. to share one across gateway clones.
	pub fn with_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = coordinator;

		self
	}

	/// Returns the refresh coordination counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}

	/// Executes one authenticated call.
	///
	/// Success and non-401 failures pass through verbatim on the first attempt. A 401
	/// runs the refresh coordinator and replays the same descriptor exactly once with
	/// fresh headers; the second outcome is returned verbatim, even if it is again a
	/// failure. An `Err` is reserved for local faults and never stands in for an HTTP
	/// failure.
	pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<RequestOutcome> {
		const KIND: CallKind = CallKind::Execute;

		let span = CallSpan::new(KIND, "execute");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let outcome = self.send_authorized(&descriptor).await?;

				if !outcome.is_auth_failure() {
					return Ok(outcome);
				}

				let signal = self
					.coordinator
					.coordinate(
						self.transport.as_ref(),
						self.store.as_ref(),
						&self.endpoints.refresh,
					)
					.await?;

				// Without a refresh token there was no exchange and the store is untouched;
				// a replay would repeat the first attempt verbatim.
				if signal == RefreshSignal::Missing {
					return Ok(outcome);
				}

				self.send_authorized(&descriptor).await
			})
			.await;

		match &result {
			Ok(outcome) if outcome.is_success() =>
				obs::record_call_outcome(KIND, CallOutcome::Success),
			_ => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Exchanges email + password for a credential pair and persists it.
	pub async fn login(&self, email: &str, password: &str) -> Result<()> {
		const KIND: CallKind = CallKind::Login;

		let span = CallSpan::new(KIND, "login");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let descriptor = RequestDescriptor::post(
					self.endpoints.login.clone(),
					serde_json::json!({ "email": email, "password": password }),
				);
				let outcome = self.transport.send(descriptor).await;
				let pair = match outcome {
					RequestOutcome::Success { status, data } =>
						CredentialPair::from_grant(data, Some(status.as_u16()))?,
					RequestOutcome::Failure { status, .. } =>
						return Err(ExchangeError::Rejected {
							status: status.map(|code| code.as_u16()),
						}
						.into()),
				};

				self.coordinator
					.run_exclusive(|| async {
						self.store
							.set(TokenKind::Access, pair.access.clone(), StoreAttributes::default())
							.await?;

						if let Some(refresh) = &pair.refresh {
							self.store
								.set(
									TokenKind::Refresh,
									refresh.clone(),
									StoreAttributes::default(),
								)
								.await?;
						}

						Ok(())
					})
					.await
			})
			.await;

		match &result {
			Ok(()) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Notifies the backend and clears both credential slots regardless of its answer.
	///
	/// Waits for any in-flight refresh to settle before clearing, so a refresh can never
	/// resurrect credentials after a logout.
	pub async fn logout(&self) -> Result<()> {
		const KIND: CallKind = CallKind::Logout;

		let span = CallSpan::new(KIND, "logout");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let descriptor =
					RequestDescriptor::builder(http::Method::POST, self.endpoints.logout.clone())
						.build();
				let _ = self.send_authorized(&descriptor).await?;

				self.coordinator
					.run_exclusive(|| async {
						self.store.clear(TokenKind::Access).await?;
						self.store.clear(TokenKind::Refresh).await?;

						Ok(())
					})
					.await
			})
			.await;

		match &result {
			Ok(()) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Read-only view of the current access token.
	pub async fn current_access_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.store.get(TokenKind::Access).await?)
	}

	async fn send_authorized(&self, descriptor: &RequestDescriptor) -> Result<RequestOutcome> {
		let mut request = descriptor.clone();

		if let Some(access) = self.store.get(TokenKind::Access).await? {
			request.headers.insert(AUTHORIZATION, bearer_value(&access)?);
		}

		Ok(self.transport.send(request).await)
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a new gateway for the provided store and endpoint set.
	///
	/// The gateway provisions its own reqwest-backed transport so callers do not need to
	/// pass HTTP handles explicitly.
	pub fn new(store: Arc<dyn CredentialStore>, endpoints: Endpoints) -> Self {
		Self::with_transport(store, endpoints, ReqwestTransport::default())
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway").field("endpoints", &self.endpoints).finish()
	}
}

fn bearer_value(access: &TokenSecret) -> Result<HeaderValue, ConfigError> {
	let mut value = HeaderValue::from_str(&format!("Bearer {}", access.expose()))?;

	value.set_sensitive(true);

	Ok(value)
}
