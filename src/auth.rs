//! Credential domain types: redacted token secrets, token kinds, and credential pairs.

pub mod credential;
pub mod secret;

pub use credential::{CredentialPair, TokenKind};
pub use secret::TokenSecret;
