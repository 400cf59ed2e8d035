//! Validated endpoint configuration consumed by the gateway.

// self
use crate::_prelude::*;

const DEFAULT_LOGIN_PATH: &str = "auth/login";
const DEFAULT_REFRESH_PATH: &str = "token/refresh";
const DEFAULT_LOGOUT_PATH: &str = "auth/logout";

/// Errors raised while constructing or validating endpoint sets.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum EndpointsError {
	/// Base URL cannot act as a base for relative paths.
	#[error("Base URL cannot be extended with endpoint paths: {base}.")]
	CannotBeABase {
		/// The offending base URL.
		base: String,
	},
	/// A relative endpoint path failed to resolve against the base URL.
	#[error("The {endpoint} path failed to resolve against the base URL.")]
	InvalidPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Immutable set of resolved auth endpoints plus the API base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	/// API base every relative call path resolves against.
	pub base: Url,
	/// Login endpoint (`POST` with email + password).
	pub login: Url,
	/// Token refresh endpoint (`POST` with the refresh token).
	pub refresh: Url,
	/// Logout endpoint (`POST`, credentials cleared regardless of outcome).
	pub logout: Url,
}
impl Endpoints {
	/// Creates a new builder seeded with the provided API base.
	pub fn builder(base: Url) -> EndpointsBuilder {
		EndpointsBuilder::new(base)
	}

	/// Builds an endpoint set from a base URL using the default auth paths.
	pub fn from_base(base: Url) -> Result<Self, EndpointsError> {
		Self::builder(base).build()
	}

	/// Resolves a relative API path against the base URL.
	pub fn api(&self, path: &str) -> Result<Url, EndpointsError> {
		self.base
			.join(path)
			.map_err(|source| EndpointsError::InvalidPath { endpoint: "api", source })
	}
}

/// Builder for [`Endpoints`] values.
#[derive(Clone, Debug)]
pub struct EndpointsBuilder {
	base: Url,
	login_path: String,
	refresh_path: String,
	logout_path: String,
}
impl EndpointsBuilder {
	fn new(base: Url) -> Self {
		Self {
			base,
			login_path: DEFAULT_LOGIN_PATH.into(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			logout_path: DEFAULT_LOGOUT_PATH.into(),
		}
	}

	/// Overrides the login path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the refresh path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the logout path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = path.into();

		self
	}

	/// Consumes the builder and resolves every endpoint against the base.
	pub fn build(self) -> Result<Endpoints, EndpointsError> {
		if self.base.cannot_be_a_base() {
			return Err(EndpointsError::CannotBeABase { base: self.base.to_string() });
		}

		let resolve = |endpoint: &'static str, path: &str| {
			self.base.join(path).map_err(|source| EndpointsError::InvalidPath { endpoint, source })
		};
		let login = resolve("login", &self.login_path)?;
		let refresh = resolve("refresh", &self.refresh_path)?;
		let logout = resolve("logout", &self.logout_path)?;

		Ok(Endpoints { base: self.base, login, refresh, logout })
	}
}
