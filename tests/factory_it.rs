// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use oidc_preset::{
	_preludet::*,
	auth::TenantId,
	discovery::WELL_KNOWN_PATH,
	error::{DocumentError, TransportError},
	factory::{CreateObserver, CreateState},
	provider::{AzureAd, CallerOptions, FlowType},
};

const TENANT: &str = "72f988bf-86f1-41af-91ab-2d7cd011db47";

#[derive(Default)]
struct Recorder(Mutex<Vec<CreateState>>);
impl Recorder {
	fn states(&self) -> Vec<CreateState> {
		self.0.lock().clone()
	}
}
impl CreateObserver for Recorder {
	fn on_transition(&self, _from: CreateState, to: CreateState) {
		self.0.lock().push(to);
	}
}

fn tenant() -> TenantId {
	TenantId::new(TENANT).expect("Tenant fixture should be valid.")
}

async fn mock_discovery<'a>(
	server: &'a MockServer,
	issuer: &str,
	with_jwks: bool,
) -> httpmock::Mock<'a> {
	let body = discovery_document(&server.base_url(), issuer, with_jwks);

	server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

async fn mock_keys(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/keys");
			then.status(200)
				.header("cache-control", "max-age=3600")
				.body(rsa_key_set_document(&["k1", "k2"]));
		})
		.await
}

#[tokio::test]
async fn azure_fixed_preset_builds_without_network() {
	let factory = build_reqwest_test_factory();
	let options = CallerOptions::new("id1").client_secret("sec1").tenant(tenant());
	let provider = factory
		.create(&options, Some(&AzureAd::preset()))
		.await
		.expect("Azure preset providers should build offline.");
	let config = provider.config();

	assert_eq!(config.site().as_str(), format!("https://login.windows.net/{TENANT}"));
	assert_eq!(config.token_path(), "/oauth2/token");
	assert_eq!(config.authorization_path(), "/oauth2/authorize");
	assert_eq!(config.scope_separator(), ',');
	assert_eq!(config.extra_parameters().get("resource").map(String::as_str), Some(TENANT));
	assert_eq!(config.flow(), FlowType::AuthCode);
	assert!(config.validate_issuer());
	assert!(provider.keys().is_none());
}

#[tokio::test]
async fn discovery_and_keys_populate_the_provider() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let discovery = mock_discovery(&server, &base, true).await;
	let keys = mock_keys(&server).await;
	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());
	let options = CallerOptions::new("id1").site(base.as_str()).discover(true);
	let provider =
		factory.create(&options, None).await.expect("Generic discovery providers should build.");
	let config = provider.config();

	assert!(config.validate_issuer());
	assert_eq!(config.issuer(), Some(base.as_str()));
	assert_eq!(config.endpoints().token.as_str(), format!("{base}/oauth2/token"));
	assert_eq!(
		config.endpoints().userinfo.as_ref().map(Url::as_str),
		Some(format!("{base}/userinfo").as_str())
	);
	assert!(config.supports_scope("profile"));

	let cache = provider.keys().expect("A discovered JWKS endpoint should yield a key cache.");
	let set = cache.current().expect("Key set should be populated during create.");

	assert_eq!(set.len(), 2);
	assert_eq!(set.ttl(), Some(Duration::hours(1)));
	assert_eq!(
		cache.get("k2").await.expect("Populated keys should resolve from memory.").kty(),
		"RSA"
	);
	assert_eq!(
		recorder.states(),
		[
			CreateState::ResolvingDiscovery,
			CreateState::BuildingConfig,
			CreateState::FetchingKeys,
			CreateState::Ready,
		]
	);

	discovery.assert_calls_async(1).await;
	keys.assert_calls_async(1).await;
}

#[tokio::test]
async fn azure_discovery_path_skips_issuer_validation() {
	let server = MockServer::start_async().await;
	let issuer = format!("https://sts.windows.net/{TENANT}/");
	let discovery = mock_discovery(&server, &issuer, true).await;
	let keys = mock_keys(&server).await;
	let factory = build_reqwest_test_factory();
	let options = CallerOptions::new("id1").tenant(tenant()).site(server.base_url());
	let provider = factory
		.create(&options, Some(&AzureAd::discovery_preset()))
		.await
		.expect("Azure discovery should tolerate a foreign issuer.");
	let config = provider.config();

	assert!(!config.validate_issuer());
	assert_eq!(config.issuer(), Some(issuer.as_str()));
	assert_eq!(config.scope_separator(), ',');
	assert_eq!(config.extra_parameters().get("resource").map(String::as_str), Some(TENANT));
	assert!(provider.keys().is_some());

	let err = factory
		.create(&options.clone().discover(true), None)
		.await
		.expect_err("Generic discovery must validate the issuer.");

	assert!(matches!(
		err,
		Error::DiscoveryInvalid { source: DocumentError::IssuerMismatch { .. }, .. }
	));

	let provider = factory
		.create(&options.discover(true).validate_issuer(false), None)
		.await
		.expect("Callers may opt out of issuer validation.");

	assert!(!provider.config().validate_issuer());

	discovery.assert_calls_async(3).await;
	keys.assert_calls_async(2).await;
}

#[tokio::test]
async fn full_discovery_urls_resolve_like_their_site() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let discovery = mock_discovery(&server, &base, false).await;
	let factory = build_reqwest_test_factory();
	let options =
		CallerOptions::new("id1").site(format!("{base}{WELL_KNOWN_PATH}")).discover(true);
	let provider = factory
		.create(&options, None)
		.await
		.expect("A site given as the discovery URL should build.");
	let config = provider.config();

	assert_eq!(config.site().as_str().trim_end_matches('/'), base);
	assert_eq!(config.issuer(), Some(base.as_str()));
	assert_eq!(config.endpoints().token.as_str(), format!("{base}/oauth2/token"));

	discovery.assert_calls_async(1).await;
}

#[tokio::test]
async fn invalid_discovery_documents_fail_the_create() {
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

	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());
	let err = factory
		.create(&CallerOptions::new("id1").site(base).discover(true), None)
		.await
		.expect_err("A document without a token endpoint must not yield a provider.");

	assert!(matches!(
		err,
		Error::DiscoveryInvalid { source: DocumentError::MissingField { field: "token_endpoint" }, .. }
	));
	assert_eq!(
		recorder.states(),
		[CreateState::ResolvingDiscovery, CreateState::Failed(ErrorKind::DiscoveryInvalid)]
	);
}

#[tokio::test]
async fn unavailable_discovery_fails_the_create() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(503);
		})
		.await;
	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());
	let err = factory
		.create(&CallerOptions::new("id1").site(server.base_url()).discover(true), None)
		.await
		.expect_err("A 503 discovery answer must not yield a provider.");

	assert!(matches!(
		err,
		Error::DiscoveryUnavailable { source: TransportError::UnexpectedStatus { status: 503, .. }, .. }
	));
	assert_eq!(
		recorder.states(),
		[CreateState::ResolvingDiscovery, CreateState::Failed(ErrorKind::DiscoveryUnavailable)]
	);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn missing_tenant_fails_before_any_request() {
	let server = MockServer::start_async().await;
	let discovery = mock_discovery(&server, &server.base_url(), false).await;
	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());
	let options =
		CallerOptions::new("id1").site(format!("{}/{{tenant}}", server.base_url())).discover(true);
	let err = factory
		.create(&options, None)
		.await
		.expect_err("A tenant placeholder without a tenant must fail.");

	assert!(matches!(&err, Error::MissingTenant { field } if field == "site"));
	assert_eq!(
		recorder.states(),
		[CreateState::ResolvingDiscovery, CreateState::Failed(ErrorKind::MissingTenant)]
	);

	discovery.assert_calls_async(0).await;
}

#[tokio::test]
async fn key_set_failures_fail_the_whole_create() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let _discovery = mock_discovery(&server, &base, true).await;
	let keys = server
		.mock_async(|when, then| {
			when.method(GET).path("/keys");
			then.status(502);
		})
		.await;
	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());
	let err = factory
		.create(&CallerOptions::new("id1").site(base).discover(true), None)
		.await
		.expect_err("An unavailable key set must fail provider construction.");

	assert_eq!(err.kind(), ErrorKind::KeySetUnavailable);
	assert_eq!(
		recorder.states().last(),
		Some(&CreateState::Failed(ErrorKind::KeySetUnavailable))
	);

	keys.assert_calls_async(1).await;
}

#[tokio::test]
async fn create_until_reports_cancellation() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let body = discovery_document(&base, &base, false);

	server
		.mock_async(|when, then| {
			when.method(GET).path(WELL_KNOWN_PATH);
			then.status(200).delay(StdDuration::from_millis(500)).body(body);
		})
		.await;

	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());
	let err = factory
		.create_until(
			&CallerOptions::new("id1").site(base).discover(true),
			None,
			tokio::time::sleep(StdDuration::from_millis(50)),
		)
		.await
		.expect_err("Cancellation should win against a slow discovery endpoint.");

	assert!(matches!(err, Error::Cancelled));
	assert_eq!(
		recorder.states(),
		[CreateState::ResolvingDiscovery, CreateState::Failed(ErrorKind::Cancelled)]
	);
}

#[tokio::test]
async fn cancelled_key_fetches_release_the_transport() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let _discovery = mock_discovery(&server, &base, true).await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/keys");
			then.status(200)
				.delay(StdDuration::from_millis(500))
				.body(rsa_key_set_document(&["k1"]));
		})
		.await;

	let recorder = Arc::new(Recorder::default());
	let factory = build_reqwest_test_factory().with_observer(recorder.clone());

	assert_eq!(Arc::strong_count(&factory.http_client), 1);

	let err = factory
		.create_until(
			&CallerOptions::new("id1").site(base).discover(true),
			None,
			tokio::time::sleep(StdDuration::from_millis(150)),
		)
		.await
		.expect_err("Cancellation should win against a slow key set endpoint.");

	assert!(matches!(err, Error::Cancelled));
	assert_eq!(
		recorder.states(),
		[
			CreateState::ResolvingDiscovery,
			CreateState::BuildingConfig,
			CreateState::FetchingKeys,
			CreateState::Failed(ErrorKind::Cancelled),
		]
	);
	assert_eq!(
		Arc::strong_count(&factory.http_client),
		1,
		"An abandoned key fetch must not keep the transport alive."
	);
}

#[tokio::test]
async fn concurrent_creates_are_independent() {
	let server = MockServer::start_async().await;
	let base = server.base_url();
	let discovery = mock_discovery(&server, &base, false).await;
	let factory = build_reqwest_test_factory();
	let options = CallerOptions::new("id1").site(base.as_str()).discover(true);
	let client_options = options.clone().flow(FlowType::Client);
	let (first, second) =
		tokio::join!(factory.create(&options, None), factory.create(&client_options, None));
	let first = first.expect("First provider should build.");
	let second = second.expect("Second provider should build.");

	assert_eq!(first.config().flow(), FlowType::AuthCode);
	assert_eq!(second.config().flow(), FlowType::Client);
	assert_eq!(first.config().endpoints(), second.config().endpoints());

	discovery.assert_calls_async(2).await;
}
