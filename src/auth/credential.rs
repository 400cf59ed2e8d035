//! Token kinds and the credential pair returned by auth endpoint exchanges.

// self
use crate::{_prelude::*, auth::secret::TokenSecret, error::ExchangeError};

/// The two credential slots the gateway manages.
///
/// The variant doubles as the persisted storage key, so backends stay layout-compatible
/// with the cookie names the backend expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
	/// Short-lived credential attached to authenticated requests.
	#[serde(rename = "access_token")]
	Access,
	/// Longer-lived credential used solely to obtain a new access token.
	#[serde(rename = "refresh_token")]
	Refresh,
}
impl TokenKind {
	/// Returns the stable storage key for this kind.
	pub const fn as_key(self) -> &'static str {
		match self {
			TokenKind::Access => "access_token",
			TokenKind::Refresh => "refresh_token",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_key())
	}
}

/// Credentials produced by a successful login or refresh exchange.
///
/// Exchanges return this value explicitly instead of writing storage as a side effect;
/// the caller holding the refresh lock decides what to persist.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
	/// Fresh access token.
	pub access: TokenSecret,
	/// Replacement refresh token, when the endpoint rotated it.
	pub refresh: Option<TokenSecret>,
}
impl CredentialPair {
	/// Builds a pair from raw token strings.
	pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
		Self { access: TokenSecret::new(access), refresh: refresh.map(TokenSecret::new) }
	}

	/// Parses the `{ "access", "refresh"? }` payload the auth endpoints return.
	pub fn from_grant(
		data: serde_json::Value,
		status: Option<u16>,
	) -> Result<Self, ExchangeError> {
		let grant: RawGrant = serde_path_to_error::deserialize(data)
			.map_err(|source| ExchangeError::MalformedResponse { source, status })?;

		Ok(Self::new(grant.access, grant.refresh))
	}
}

impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access", &"<redacted>")
			.field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

#[derive(Deserialize)]
struct RawGrant {
	access: String,
	refresh: Option<String>,
}
