//! Transport primitives for outbound API calls.
//!
//! The module exposes [`Transport`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can integrate custom HTTP clients
//! without losing the gateway's instrumentation hooks. Implementations call
//! [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status or retry hint is known.
//!
//! A transport performs exactly one network call per [`send`](Transport::send): it never
//! retries and never interprets status codes beyond mapping them into a
//! [`RequestOutcome`]. Retry and refresh decisions belong to the gateway layer.

// crates.io
use http::{
	HeaderMap, HeaderValue,
	header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	request::{RequestDescriptor, RequestOutcome},
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = RequestOutcome> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one outbound call.
///
/// The trait is the gateway's only dependency on an HTTP stack. Network-level failures are
/// data, not errors: a dispatch that produces no response resolves to
/// `Failure { status: None, body: None }` instead of an `Err`, so the gateway's retry
/// logic sees every outcome through one shape.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches exactly one HTTP request described by `descriptor`.
	///
	/// Implementations must merge [`base_headers`] beneath the descriptor's own headers;
	/// caller-supplied headers win on conflict.
	fn send(&self, descriptor: RequestDescriptor) -> TransportFuture<'_>;

	/// Returns metadata captured from the most recent response, when the transport
	/// records any.
	fn last_metadata(&self) -> Option<ResponseMetadata> {
		None
	}
}

/// Captures metadata from the most recent HTTP response for instrumentation.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and gateway layers.
///
/// Transports take the slot's contents immediately before dispatching so traces from prior
/// attempts never leak into a new invocation, then store fresh metadata once a response
/// arrives.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}

	/// Returns a copy of the captured metadata without consuming it.
	pub fn peek(&self) -> Option<ResponseMetadata> {
		self.0.lock().clone()
	}
}

/// Caller-independent base headers merged beneath every descriptor's own set.
pub fn base_headers() -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
	headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

	headers
}

/// Merges the caller's headers over the base set; caller entries win on conflict.
pub fn merge_headers(caller: &HeaderMap) -> HeaderMap {
	let mut merged = base_headers();

	for (name, value) in caller {
		merged.insert(name, value.clone());
	}

	merged
}

/// Decodes a response body into JSON; non-JSON payloads are preserved as strings.
pub(crate) fn decode_body(bytes: &[u8]) -> Option<serde_json::Value> {
	if bytes.is_empty() {
		return None;
	}

	match serde_json::from_slice(bytes) {
		Ok(value) => Some(value),
		Err(_) => Some(serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())),
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The client captures a [`ResponseMetadata`] snapshot for every dispatch; embedders that
/// need the Retry-After hint of the last failure read it via
/// [`Transport::last_metadata`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, slot: ResponseMetadataSlot::default() }
	}

	/// Returns the underlying reqwest client.
	pub fn client(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, descriptor: RequestDescriptor) -> TransportFuture<'_> {
		Box::pin(async move {
			self.slot.take();

			let headers = merge_headers(&descriptor.headers);
			let mut builder =
				self.client.request(descriptor.method, descriptor.url).headers(headers);

			if let Some(body) = &descriptor.body {
				builder = builder.body(body.to_string());
			}

			let response = match builder.send().await {
				Ok(response) => response,
				Err(_) => return RequestOutcome::Failure { status: None, body: None },
			};
			let status = response.status();
			let retry_after = parse_retry_after(response.headers());

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let body = match response.bytes().await {
				Ok(bytes) => decode_body(&bytes),
				Err(_) => None,
			};

			if status.is_success() {
				RequestOutcome::Success { status, data: body.unwrap_or(serde_json::Value::Null) }
			} else {
				RequestOutcome::Failure { status: Some(status), body }
			}
		})
	}

	fn last_metadata(&self) -> Option<ResponseMetadata> {
		self.slot.peek()
	}
}

// Retry-After is either a relative second count or an RFC 2822 date.
#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return (secs >= 0).then_some(Duration::seconds(secs));
	}

	let deadline = OffsetDateTime::parse(raw, &Rfc2822).ok()?;
	let remaining = deadline - OffsetDateTime::now_utc();

	remaining.is_positive().then_some(remaining)
}
