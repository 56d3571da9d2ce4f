//! Single-flight JWKS cache bound to one `jwks_uri`.
//!
//! A lookup miss triggers at most one refresh. Concurrent callers join the refresh that is
//! already in flight instead of issuing their own request. The refresh runs as a shared future,
//! so a caller that gives up waiting never cancels it for the others. A successful refresh
//! swaps the whole [`KeySet`] at once; a failed one leaves the previous set in place.

// std
use std::sync::Weak;
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	error::KeySetFailure,
	http::{self, ProviderHttpClient},
	jwks::{KeySet, VerificationKey},
	obs::{self, Stage},
};

type RefreshOutcome = Result<Arc<KeySet>, Arc<KeySetFailure>>;
type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Tuning knobs for [`KeySetCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySetCacheConfig {
	/// Minimum age of the current set before a lookup miss may refresh it again.
	///
	/// Zero (the default) refreshes on every miss.
	pub min_refresh_interval: Duration,
}
impl KeySetCacheConfig {
	/// Sets the minimum interval between refreshes triggered by unknown key ids.
	pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
		self.min_refresh_interval = interval;

		self
	}
}

/// Cache of verification keys published at a JWKS endpoint.
///
/// Clones share the same keys and the same in-flight refresh.
pub struct KeySetCache<C>
where
	C: ?Sized + ProviderHttpClient,
{
	inner: Arc<Inner<C>>,
}
impl<C> KeySetCache<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates an empty cache for `jwks_uri`.
	pub fn new(jwks_uri: Url, http_client: impl Into<Arc<C>>) -> Self {
		Self::with_config(jwks_uri, http_client, KeySetCacheConfig::default())
	}

	/// Creates an empty cache with explicit tuning.
	pub fn with_config(
		jwks_uri: Url,
		http_client: impl Into<Arc<C>>,
		config: KeySetCacheConfig,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				jwks_uri,
				http_client: http_client.into(),
				config,
				current: RwLock::new(None),
				in_flight: Mutex::new(None),
			}),
		}
	}

	/// JWKS endpoint this cache is bound to.
	pub fn jwks_uri(&self) -> &Url {
		&self.inner.jwks_uri
	}

	/// Tuning in effect.
	pub fn config(&self) -> KeySetCacheConfig {
		self.inner.config
	}

	/// Current key set, if one was fetched.
	pub fn current(&self) -> Option<Arc<KeySet>> {
		self.inner.current.read().clone()
	}

	/// Returns true when nothing was fetched yet or `ttl` has elapsed since the last fetch.
	///
	/// The cache never refreshes on a timer; callers poll this and call
	/// [`KeySetCache::refresh`] on their own cadence.
	pub fn is_stale(&self, ttl: Duration) -> bool {
		self.current().is_none_or(|set| set.is_stale(ttl))
	}

	/// Returns the key with identifier `kid`, refreshing once on a miss.
	pub async fn get(&self, kid: &str) -> Result<VerificationKey> {
		let observed = self.current();

		if let Some(key) = observed.as_ref().and_then(|set| set.get(kid)) {
			return Ok(key.clone());
		}
		if let Some(set) = &observed
			&& !set.is_stale(self.inner.config.min_refresh_interval)
		{
			return Err(Error::UnknownKey { kid: kid.to_owned() });
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(kid, jwks_uri = %self.inner.jwks_uri, "Key id missing, refreshing key set.");

		let set = self.refresh_after(observed.as_ref()).await?;

		set.get(kid).cloned().ok_or_else(|| Error::UnknownKey { kid: kid.to_owned() })
	}

	/// Fetches the key set now, or joins the refresh already in flight.
	pub async fn refresh(&self) -> Result<Arc<KeySet>> {
		let pending = self.join_or_start(&mut self.inner.in_flight.lock());

		self.settle(pending).await
	}

	async fn refresh_after(&self, observed: Option<&Arc<KeySet>>) -> Result<Arc<KeySet>> {
		let pending = {
			let mut slot = self.inner.in_flight.lock();
			let current = self.inner.current.read().clone();

			// Another caller already replaced the set this miss was observed against.
			if let Some(current) = current
				&& observed.is_none_or(|observed| !Arc::ptr_eq(observed, &current))
			{
				return Ok(current);
			}

			self.join_or_start(&mut slot)
		};

		self.settle(pending).await
	}

	fn join_or_start(&self, slot: &mut Option<InFlight>) -> InFlight {
		if let Some(pending) = slot.as_ref() {
			return pending.clone();
		}

		// The pending fetch must not keep the cache alive once every handle is gone.
		let cache = Arc::downgrade(&self.inner);
		let http_client = self.inner.http_client.clone();
		let jwks_uri = self.inner.jwks_uri.clone();
		let pending = async move {
			let outcome = fetch(http_client.as_ref(), &jwks_uri).await;

			if let Some(inner) = Weak::upgrade(&cache) {
				if let Ok(set) = &outcome {
					*inner.current.write() = Some(set.clone());
				}

				*inner.in_flight.lock() = None;
			}

			outcome
		}
		.boxed()
		.shared();

		*slot = Some(pending.clone());

		pending
	}

	async fn settle(&self, pending: InFlight) -> Result<Arc<KeySet>> {
		pending
			.await
			.map_err(|source| Error::KeySetUnavailable { url: self.inner.jwks_uri.clone(), source })
	}
}
impl<C> Clone for KeySetCache<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}
impl<C> Debug for KeySetCache<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeySetCache")
			.field("jwks_uri", &self.inner.jwks_uri.as_str())
			.field("keys", &self.current().map(|set| set.len()))
			.field("refreshing", &self.inner.in_flight.lock().is_some())
			.finish()
	}
}

struct Inner<C>
where
	C: ?Sized + ProviderHttpClient,
{
	jwks_uri: Url,
	http_client: Arc<C>,
	config: KeySetCacheConfig,
	current: RwLock<Option<Arc<KeySet>>>,
	in_flight: Mutex<Option<InFlight>>,
}

async fn fetch<C>(http_client: &C, jwks_uri: &Url) -> RefreshOutcome
where
	C: ?Sized + ProviderHttpClient,
{
	obs::observe(Stage::KeySet, "refresh", async {
		let document = http::fetch_document(http_client, jwks_uri)
			.await
			.map_err(|e| Arc::new(KeySetFailure::from(e)))?;
		let set =
			Arc::new(KeySet::from_document(&document).map_err(|e| Arc::new(KeySetFailure::from(e)))?);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			jwks_uri = %jwks_uri,
			keys = set.len(),
			skipped = set.skipped(),
			"Key set refreshed."
		);

		Ok(set)
	})
	.await
}
