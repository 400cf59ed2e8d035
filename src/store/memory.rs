//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	store::{CredentialStore, StoreAttributes, StoreError, StoreFuture, StoredCredential},
};

type StoreMap = Arc<RwLock<HashMap<TokenKind, StoredCredential>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn get_now(map: StoreMap, kind: TokenKind) -> Option<TokenSecret> {
		map.read().get(&kind).map(|entry| entry.secret.clone())
	}

	fn set_now(
		map: StoreMap,
		kind: TokenKind,
		secret: TokenSecret,
		attributes: StoreAttributes,
	) -> Result<(), StoreError> {
		map.write().insert(kind, StoredCredential { secret, attributes });

		Ok(())
	}

	fn clear_now(map: StoreMap, kind: TokenKind) -> Result<(), StoreError> {
		map.write().remove(&kind);

		Ok(())
	}

	/// Returns the attributes recorded for the provided kind, if a secret is stored.
	pub fn attributes(&self, kind: TokenKind) -> Option<StoreAttributes> {
		self.0.read().get(&kind).map(|entry| entry.attributes)
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, kind: TokenKind) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, kind)) })
	}

	fn set(
		&self,
		kind: TokenKind,
		secret: TokenSecret,
		attributes: StoreAttributes,
	) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_now(map, kind, secret, attributes) })
	}

	fn clear(&self, kind: TokenKind) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::clear_now(map, kind) })
	}
}
