//! Demonstrates the gateway's full session cycle against a mock backend: login, an
//! authenticated call, a transparent refresh after the access token goes stale, and logout.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use auth_gateway::{
	auth::{TokenKind, TokenSecret},
	endpoint::Endpoints,
	gateway::Gateway,
	request::RequestDescriptor,
	store::{CredentialStore, MemoryStore, StoreAttributes},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"demo-access\",\"refresh\":\"demo-refresh\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/cases").header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"cases\":[\"case-1\",\"case-2\"]}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/cases").header("authorization", "Bearer expired-access");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"demo-access\",\"refresh\":\"demo-refresh-2\"}");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/logout");
			then.status(200);
		})
		.await;

	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let endpoints = Endpoints::from_base(Url::parse(&server.base_url())?)?;
	let gateway = Gateway::new(store, endpoints);

	gateway.login("analyst@example.test", "hunter2").await?;
	println!("logged in, access token present: {}", gateway.current_access_token().await?.is_some());

	let cases = gateway.endpoints.api("cases")?;
	let outcome = gateway.execute(RequestDescriptor::get(cases.clone())).await?;

	println!("first call succeeded: {}", outcome.is_success());

	// Simulate an expired access token; the next call recovers through one refresh.
	store_backend
		.set(TokenKind::Access, TokenSecret::new("expired-access"), StoreAttributes::default())
		.await?;

	let outcome = gateway.execute(RequestDescriptor::get(cases)).await?;

	println!(
		"replay after refresh succeeded: {} (refresh exchanges: {})",
		outcome.is_success(),
		gateway.refresh_metrics().attempts(),
	);

	gateway.logout().await?;
	println!("logged out, access token present: {}", gateway.current_access_token().await?.is_some());

	Ok(())
}
