//! Provider construction: discovery, config merge, and key set population in one call.
//!
//! [`ProviderFactory::create`] walks a small state machine,
//! `Start -> ResolvingDiscovery -> BuildingConfig -> FetchingKeys -> Ready`. Discovery is
//! skipped unless the options (or the preset) request it, and key fetching is skipped when no
//! JWKS endpoint is known. Any failure moves to `Failed(kind)` and ends the call; no partially
//! built provider is ever returned.

// std
use std::{mem, pin::pin};
// crates.io
use futures::future::{self, Either};
// self
use crate::{
	_prelude::*,
	discovery::DiscoveryResolver,
	http::ProviderHttpClient,
	jwks::{KeySetCache, KeySetCacheConfig},
	obs::{self, Stage},
	provider::{self, CallerOptions, ProviderConfig, VendorPreset},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Factory specialized for the crate's default reqwest transport.
pub type ReqwestProviderFactory = ProviderFactory<ReqwestHttpClient>;

/// States of a single [`ProviderFactory::create`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CreateState {
	/// Nothing has happened yet.
	Start,
	/// Fetching the discovery document.
	ResolvingDiscovery,
	/// Merging options, preset, and metadata.
	BuildingConfig,
	/// Populating the key set cache.
	FetchingKeys,
	/// The provider is ready.
	Ready,
	/// Construction stopped with the given error kind.
	Failed(ErrorKind),
}
impl CreateState {
	/// Returns true for `Ready` and `Failed`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, CreateState::Ready | CreateState::Failed(_))
	}
}
impl Display for CreateState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			CreateState::Start => f.write_str("start"),
			CreateState::ResolvingDiscovery => f.write_str("resolving_discovery"),
			CreateState::BuildingConfig => f.write_str("building_config"),
			CreateState::FetchingKeys => f.write_str("fetching_keys"),
			CreateState::Ready => f.write_str("ready"),
			CreateState::Failed(kind) => write!(f, "failed({kind})"),
		}
	}
}

/// Receives every state transition of provider construction.
pub trait CreateObserver
where
	Self: Send + Sync,
{
	/// Called after the state machine moved from `from` to `to`.
	fn on_transition(&self, from: CreateState, to: CreateState) {
		let _ = (from, to);
	}
}

/// A constructed provider: immutable configuration plus its key set cache.
pub struct Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	config: Arc<ProviderConfig>,
	keys: Option<KeySetCache<C>>,
}
impl<C> Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Resolved configuration.
	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}

	/// Shared handle to the configuration for downstream token flows.
	pub fn shared_config(&self) -> Arc<ProviderConfig> {
		self.config.clone()
	}

	/// Key set cache, when a JWKS endpoint is known.
	pub fn keys(&self) -> Option<&KeySetCache<C>> {
		self.keys.as_ref()
	}
}
impl<C> Clone for Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn clone(&self) -> Self {
		Self { config: self.config.clone(), keys: self.keys.clone() }
	}
}
impl<C> Debug for Provider<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Provider").field("config", &self.config).field("keys", &self.keys).finish()
	}
}

/// Builds [`Provider`]s over a shared HTTP transport.
///
/// The factory holds no per-provider state, so concurrent `create` calls are independent.
pub struct ProviderFactory<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Transport used for discovery and JWKS requests.
	pub http_client: Arc<C>,
	/// Tuning applied to every key set cache the factory creates.
	pub key_set_config: KeySetCacheConfig,
	observer: Option<Arc<dyn CreateObserver>>,
}
impl<C> ProviderFactory<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a factory over the provided transport.
	pub fn with_http_client(http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), key_set_config: Default::default(), observer: None }
	}

	/// Sets the tuning for key set caches created from now on.
	pub fn with_key_set_config(mut self, config: KeySetCacheConfig) -> Self {
		self.key_set_config = config;

		self
	}

	/// Attaches an observer notified of every state transition.
	pub fn with_observer(mut self, observer: Arc<dyn CreateObserver>) -> Self {
		self.observer = Some(observer);

		self
	}

	/// Builds a provider from caller options and an optional vendor preset.
	pub async fn create(
		&self,
		options: &CallerOptions,
		preset: Option<&VendorPreset>,
	) -> Result<Provider<C>> {
		self.create_until(options, preset, future::pending::<()>()).await
	}

	/// Same as [`ProviderFactory::create`], but gives up with [`Error::Cancelled`] as soon as
	/// `cancel` completes.
	///
	/// A key refresh already in flight keeps running for any other waiter.
	pub async fn create_until<F>(
		&self,
		options: &CallerOptions,
		preset: Option<&VendorPreset>,
		cancel: F,
	) -> Result<Provider<C>>
	where
		F: Future<Output = ()>,
	{
		let states = Transitions::new(self.observer.as_deref());

		obs::observe(Stage::Create, "create", async {
			let run = pin!(self.run(options, preset, &states));
			let cancel = pin!(cancel);
			let result = match future::select(run, cancel).await {
				Either::Left((result, _)) => result,
				Either::Right(((), _)) => Err(Error::Cancelled),
			};

			match &result {
				Ok(_) => states.advance(CreateState::Ready),
				Err(e) => states.advance(CreateState::Failed(e.kind())),
			}

			result
		})
		.await
	}

	async fn run(
		&self,
		options: &CallerOptions,
		preset: Option<&VendorPreset>,
		states: &Transitions<'_>,
	) -> Result<Provider<C>> {
		let merged = match preset {
			Some(preset) => preset.overlay(options.clone()),
			None => options.clone(),
		};
		let metadata = if merged.requests_discovery() {
			states.advance(CreateState::ResolvingDiscovery);

			let site = provider::effective_site(&merged)?;
			let mut resolver = DiscoveryResolver::<C>::with_http_client(self.http_client.clone());

			if let Some(path) = merged.well_known_path.as_deref() {
				resolver = resolver.with_well_known_path(path);
			}

			Some(resolver.resolve(&site).await?)
		} else {
			None
		};

		states.advance(CreateState::BuildingConfig);

		let config = ProviderConfig::build(options, metadata.as_ref(), preset)?;
		let keys = match config.endpoints().jwks.clone() {
			Some(jwks_uri) => {
				states.advance(CreateState::FetchingKeys);

				let cache = KeySetCache::<C>::with_config(
					jwks_uri,
					self.http_client.clone(),
					self.key_set_config,
				);

				cache.refresh().await?;

				Some(cache)
			},
			None => None,
		};

		Ok(Provider { config: Arc::new(config), keys })
	}
}
#[cfg(feature = "reqwest")]
impl ProviderFactory<ReqwestHttpClient> {
	/// Creates a factory backed by a default reqwest client.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl Default for ProviderFactory<ReqwestHttpClient> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C> Clone for ProviderFactory<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			key_set_config: self.key_set_config,
			observer: self.observer.clone(),
		}
	}
}
impl<C> Debug for ProviderFactory<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderFactory")
			.field("key_set_config", &self.key_set_config)
			.field("observer_set", &self.observer.is_some())
			.finish()
	}
}

struct Transitions<'a> {
	observer: Option<&'a dyn CreateObserver>,
	state: Mutex<CreateState>,
}
impl<'a> Transitions<'a> {
	fn new(observer: Option<&'a dyn CreateObserver>) -> Self {
		Self { observer, state: Mutex::new(CreateState::Start) }
	}

	fn advance(&self, to: CreateState) {
		let from = mem::replace(&mut *self.state.lock(), to);

		#[cfg(feature = "tracing")]
		tracing::debug!(%from, %to, "Provider construction state changed.");

		if let Some(observer) = self.observer {
			observer.on_transition(from, to);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::TenantId,
		provider::{AzureAd, FlowType},
	};

	#[derive(Default)]
	struct Recorder(Mutex<Vec<(CreateState, CreateState)>>);
	impl CreateObserver for Recorder {
		fn on_transition(&self, from: CreateState, to: CreateState) {
			self.0.lock().push((from, to));
		}
	}

	fn tenant(value: &str) -> TenantId {
		TenantId::new(value).expect("Tenant fixture should be valid.")
	}

	#[tokio::test]
	async fn fixed_presets_skip_discovery_and_keys() {
		let recorder = Arc::new(Recorder::default());
		let factory = ProviderFactory::new().with_observer(recorder.clone());
		let options = CallerOptions::new("id1")
			.client_secret("sec1")
			.tenant(tenant("guid1"))
			.flow(FlowType::AuthJwt);
		let provider = factory
			.create(&options, Some(&AzureAd::preset()))
			.await
			.expect("Fixed preset providers need no network.");

		assert!(provider.keys().is_none());
		assert_eq!(provider.config().site().as_str(), "https://login.windows.net/guid1");
		assert_eq!(
			provider.config().extra_parameters().get("requested_token_use").map(String::as_str),
			Some("on_behalf_of")
		);
		assert_eq!(
			recorder.0.lock().as_slice(),
			[
				(CreateState::Start, CreateState::BuildingConfig),
				(CreateState::BuildingConfig, CreateState::Ready),
			]
		);
	}

	#[tokio::test]
	async fn failures_end_in_a_terminal_state() {
		let recorder = Arc::new(Recorder::default());
		let factory = ProviderFactory::new().with_observer(recorder.clone());
		let err = factory
			.create(&CallerOptions::new("id1"), Some(&AzureAd::preset()))
			.await
			.expect_err("A tenant placeholder without a tenant must fail.");

		assert_eq!(err.kind(), ErrorKind::MissingTenant);
		assert_eq!(
			recorder.0.lock().last().map(|(_, to)| *to),
			Some(CreateState::Failed(ErrorKind::MissingTenant))
		);
		assert!(CreateState::Failed(ErrorKind::MissingTenant).is_terminal());
		assert_eq!(CreateState::Failed(ErrorKind::Cancelled).to_string(), "failed(cancelled)");
	}

	#[tokio::test]
	async fn ready_cancellation_still_lets_a_finished_run_win() {
		let factory = ProviderFactory::new();
		let options = AzureAd::options("id1", "sec1", tenant("guid1"));
		let provider = factory
			.create_until(&options, None, future::ready(()))
			.await
			.expect("A run that needs no network completes on its first poll.");

		assert_eq!(provider.config().client_id(), "id1");
	}
}
