//! Request descriptors and structured request outcomes.

// crates.io
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
// self
use crate::_prelude::*;

/// Immutable value describing one outbound call.
///
/// Descriptors are constructed by callers and never mutated by the gateway; a replay after
/// a refresh re-sends the same descriptor with freshly resolved credentials.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Optional JSON body.
	pub body: Option<serde_json::Value>,
	/// Caller-supplied headers; they take precedence over the transport's base set.
	pub headers: HeaderMap,
}
impl RequestDescriptor {
	/// Returns a builder for the provided method and URL.
	pub fn builder(method: Method, url: Url) -> RequestDescriptorBuilder {
		RequestDescriptorBuilder::new(method, url)
	}

	/// Shorthand for a GET descriptor without body or extra headers.
	pub fn get(url: Url) -> Self {
		Self::builder(Method::GET, url).build()
	}

	/// Shorthand for a POST descriptor carrying a JSON body.
	pub fn post(url: Url, body: serde_json::Value) -> Self {
		Self::builder(Method::POST, url).body(body).build()
	}
}

/// Builder for [`RequestDescriptor`].
#[derive(Clone, Debug)]
pub struct RequestDescriptorBuilder {
	method: Method,
	url: Url,
	body: Option<serde_json::Value>,
	headers: HeaderMap,
}
impl RequestDescriptorBuilder {
	fn new(method: Method, url: Url) -> Self {
		Self { method, url, body: None, headers: HeaderMap::new() }
	}

	/// Attaches a JSON body.
	pub fn body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends a caller header; it wins over the transport's base set on conflict.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Consumes the builder and produces the descriptor.
	pub fn build(self) -> RequestDescriptor {
		RequestDescriptor { method: self.method, url: self.url, body: self.body, headers: self.headers }
	}
}

/// Tagged result of one transport dispatch. No partial or streaming states.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestOutcome {
	/// The call completed with a success status.
	Success {
		/// HTTP status code of the response.
		status: StatusCode,
		/// Decoded JSON body; `Null` when the response carried no payload.
		data: serde_json::Value,
	},
	/// The call failed, either with an error status or without any response at all.
	Failure {
		/// HTTP status code, absent on network-level failure.
		status: Option<StatusCode>,
		/// Decoded JSON body of the error response, when one arrived.
		body: Option<serde_json::Value>,
	},
}
impl RequestOutcome {
	/// Returns `true` for [`RequestOutcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}

	/// Classifies a failure; `None` for successful outcomes.
	pub fn failure_kind(&self) -> Option<FailureKind> {
		match self {
			Self::Success { .. } => None,
			Self::Failure { status, .. } => Some(FailureKind::classify(*status)),
		}
	}

	/// Returns `true` when this outcome is the 401 failure that triggers the refresh path.
	pub fn is_auth_failure(&self) -> bool {
		self.failure_kind() == Some(FailureKind::Auth)
	}

	/// Returns the failure status code, when one is present.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Success { status, .. } => Some(*status),
			Self::Failure { status, .. } => *status,
		}
	}
}

/// Failure taxonomy derived from a [`RequestOutcome::Failure`] status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// No response arrived at all.
	Network,
	/// Authorization failure (401); recoverable once through the refresh path.
	Auth,
	/// Any other non-401 client error.
	Client,
	/// Server-side failure (5xx).
	Server,
}
impl FailureKind {
	/// Classifies an optional status code into the gateway's failure taxonomy.
	pub fn classify(status: Option<StatusCode>) -> Self {
		match status {
			None => Self::Network,
			Some(StatusCode::UNAUTHORIZED) => Self::Auth,
			Some(code) if code.is_server_error() => Self::Server,
			Some(_) => Self::Client,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureKind::Network => "network",
			FailureKind::Auth => "auth",
			FailureKind::Client => "client",
			FailureKind::Server => "server",
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
