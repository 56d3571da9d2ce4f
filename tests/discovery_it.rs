// crates.io
use httpmock::prelude::*;
// self
use oidc_preset::{
	_preludet::*,
	discovery::{DiscoveryResolver, WELL_KNOWN_PATH},
	error::{DocumentError, TransportError},
	http::ReqwestHttpClient,
};

fn resolver() -> DiscoveryResolver<ReqwestHttpClient> {
	DiscoveryResolver::with_http_client(test_reqwest_http_client())
}

fn site(server: &MockServer) -> Url {
	Url::parse(&server.base_url()).expect("Mock server base URL should parse.")
}

#[tokio::test]
async fn resolve_fetches_and_normalizes_the_document() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(discovery_document(&base, &base, true));
		})
		.await;
	let metadata = resolver()
		.resolve(&site(&server))
		.await
		.expect("Discovery against the mock server should succeed.");

	assert_eq!(metadata.issuer, base);
	assert_eq!(metadata.token_endpoint.as_str(), format!("{base}/oauth2/token"));
	assert_eq!(metadata.jwks_uri.as_ref().map(Url::as_str), Some(format!("{base}/keys").as_str()));
	assert_eq!(metadata.source.path(), WELL_KNOWN_PATH);
	assert!(metadata.supports_scope("email"));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn resolve_issues_one_request_per_call() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(200).body(discovery_document(&base, &base, false));
		})
		.await;
	let resolver = resolver();

	for _ in 0..2 {
		resolver.resolve(&site(&server)).await.expect("Discovery should succeed.");
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn incomplete_documents_are_invalid() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let body = serde_json::json!({
		"issuer": base,
		"authorization_endpoint": format!("{base}/oauth2/authorize"),
	})
	.to_string();

	server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(200).body(body);
		})
		.await;

	let err = resolver()
		.resolve(&site(&server))
		.await
		.expect_err("A document without a token endpoint must be rejected.");

	assert!(matches!(
		err,
		Error::DiscoveryInvalid { source: DocumentError::MissingField { field: "token_endpoint" }, .. }
	));
	assert_eq!(err.kind(), ErrorKind::DiscoveryInvalid);
}

#[tokio::test]
async fn non_json_bodies_are_invalid() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(200).body("<html>maintenance</html>");
		})
		.await;

	let err = resolver()
		.resolve(&site(&server))
		.await
		.expect_err("An HTML body must be rejected.");

	assert!(matches!(err, Error::DiscoveryInvalid { source: DocumentError::Parse { .. }, .. }));
}

#[tokio::test]
async fn server_errors_are_unavailable() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(503).header("retry-after", "30");
		})
		.await;
	let err = resolver()
		.resolve(&site(&server))
		.await
		.expect_err("A 503 answer must surface as unavailable.");

	match err {
		Error::DiscoveryUnavailable {
			source: TransportError::UnexpectedStatus { status, retry_after },
			url,
		} => {
			assert_eq!(status, 503);
			assert_eq!(retry_after, Some(Duration::seconds(30)));
			assert_eq!(url.path(), WELL_KNOWN_PATH);
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreachable_hosts_are_unavailable() {
	let site = Url::parse("http://127.0.0.1:1").expect("Closed-port URL should parse.");
	let err = resolver()
		.resolve(&site)
		.await
		.expect_err("A refused connection must surface as unavailable.");

	assert!(matches!(err, Error::DiscoveryUnavailable { source: TransportError::Network { .. }, .. }));
}

#[tokio::test]
async fn custom_well_known_paths_are_honored() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/oauth-authorization-server");
			then.status(200).body(discovery_document(&base, &base, false));
		})
		.await;
	let metadata = resolver()
		.with_well_known_path("/.well-known/oauth-authorization-server")
		.resolve(&site(&server))
		.await
		.expect("Discovery at a custom path should succeed.");

	assert!(metadata.jwks_uri.is_none());

	mock.assert_calls_async(1).await;
}
