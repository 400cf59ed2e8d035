//! Storage contracts and built-in credential store implementations.
//!
//! The store is an opaque key-value surface keyed by [`TokenKind`]: it never interprets
//! token contents or expiry. Both credential slots are written only by login, logout, and
//! the refresh critical section; everything else reads.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the secret stored under the provided kind, if present.
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces the secret stored under the provided kind.
	fn set(
		&self,
		kind: TokenKind,
		secret: TokenSecret,
		attributes: StoreAttributes,
	) -> StoreFuture<'_, ()>;

	/// Removes the secret stored under the provided kind.
	fn clear(&self, kind: TokenKind) -> StoreFuture<'_, ()>;
}

/// Cookie-equivalent attributes recorded alongside each persisted secret.
///
/// The store treats these as opaque metadata; backends that map onto a real cookie jar
/// forward them as the `Secure` and `SameSite` attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAttributes {
	/// Restricts the credential to secure transports.
	pub secure: bool,
	/// Cross-site policy applied to the credential.
	pub same_site: SameSite,
}
impl Default for StoreAttributes {
	fn default() -> Self {
		Self { secure: true, same_site: SameSite::Strict }
	}
}

/// Cross-site policy values for [`StoreAttributes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	/// Credential is never sent cross-site.
	Strict,
	/// Credential is sent on top-level cross-site navigation.
	Lax,
	/// No cross-site restriction.
	None,
}

/// A stored secret together with the attributes it was written with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredCredential {
	/// The persisted secret.
	pub secret: TokenSecret,
	/// Attributes requested at write time.
	pub attributes: StoreAttributes,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
