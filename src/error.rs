//! Gateway-level error types shared across the transport, store, and session layers.
//!
//! Expected authorization failures never surface here: a 401 on a first attempt is recovered
//! through the refresh path, and every other HTTP failure flows back to the caller as a
//! [`RequestOutcome`](crate::request::RequestOutcome). An [`Error`] always means a local
//! fault: bad configuration, a storage backend problem, or an auth endpoint response the
//! gateway could not use.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Auth endpoint exchange that produced no usable credentials.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint configuration failed to validate.
	#[error(transparent)]
	Endpoints(#[from] crate::endpoint::EndpointsError),
	/// A header value could not be constructed from the supplied token.
	#[error("Header value could not be constructed.")]
	InvalidHeader(#[from] http::header::InvalidHeaderValue),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures of the login and refresh exchanges against the auth endpoints.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Auth endpoint refused the exchange or never responded.
	#[error("Auth endpoint rejected the exchange.")]
	Rejected {
		/// HTTP status code, when a response arrived at all.
		status: Option<u16>,
	},
	/// Auth endpoint responded with JSON the gateway could not parse.
	#[error("Auth endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the malformed response.
		status: Option<u16>,
	},
}
