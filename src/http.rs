//! Transport primitives for discovery and key set fetches.
//!
//! The module exposes [`ProviderHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can plug in custom HTTP clients without
//! losing status and caching hints. Implementations call [`ResponseMetadataSlot::take`]
//! before dispatching a request and [`ResponseMetadataSlot::store`] once an HTTP status,
//! retry hint, or cache lifetime is known.

// std
use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{Method, Request, header::ACCEPT},
};
#[cfg(feature = "reqwest")] use reqwest::header::{CACHE_CONTROL, HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Abstraction over HTTP transports capable of fetching discovery and JWKS documents while
/// publishing response metadata.
///
/// The trait is the crate's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so a single transport can back every provider under construction
/// and every key set refresh, and the handles they return must own whatever state their
/// request futures need so those futures stay `Send` for the lifetime of the fetch.
pub trait ProviderHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across requests.
	/// - Once an HTTP response provides status headers, save them with
	///   [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
	/// `Cache-Control: max-age` lifetime advertised by the endpoint.
	pub max_age: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and fetch layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Successful response body plus the metadata captured for it.
#[derive(Clone, Debug)]
pub struct FetchedDocument {
	/// Raw response body.
	pub body: Vec<u8>,
	/// Metadata recorded by the transport.
	pub metadata: ResponseMetadata,
}

/// Issues a single `GET` for a JSON document and rejects non-success statuses.
pub async fn fetch_document<C>(client: &C, url: &Url) -> Result<FetchedDocument, TransportError>
where
	C: ?Sized + ProviderHttpClient,
{
	let slot = ResponseMetadataSlot::default();
	let handle = client.with_metadata(slot.clone());
	let request: HttpRequest = Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(ACCEPT, "application/json")
		.body(Vec::new())?;
	let response = handle.call(request).await.map_err(map_http_client_error)?;
	let status = response.status();
	let metadata = slot
		.take()
		.unwrap_or_else(|| ResponseMetadata { status: Some(status.as_u16()), ..Default::default() });

	if !status.is_success() {
		return Err(TransportError::UnexpectedStatus {
			status: status.as_u16(),
			retry_after: metadata.retry_after,
		});
	}

	Ok(FetchedDocument { body: response.into_body(), metadata })
}

fn map_http_client_error<E>(err: HttpClientError<E>) -> TransportError
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::Network { source: inner },
		HttpClientError::Http(inner) => TransportError::Request(inner),
		HttpClientError::Io(inner) => TransportError::Io(inner),
		HttpClientError::Other(message) => TransportError::Other { message },
		other => TransportError::Other { message: format!("{other:?}") },
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented HTTP client that captures response metadata.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ProviderHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		self.instrumented(slot)
	}
}

#[cfg(feature = "reqwest")]
/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
pub(crate) struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

#[cfg(feature = "reqwest")]
/// Public handle returned by [`ReqwestHttpClient`] that satisfies [`ProviderHttpClient`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient { client, slot }))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: parse_retry_after(&headers),
				max_age: parse_max_age(&headers),
			});

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(feature = "reqwest")]
fn parse_max_age(headers: &HeaderMap) -> Option<Duration> {
	let raw = headers.get(CACHE_CONTROL)?.to_str().ok()?;

	max_age_directive(raw)
}

/// Extracts `max-age` from a `Cache-Control` value; `no-store`/`no-cache` yield zero.
pub(crate) fn max_age_directive(raw: &str) -> Option<Duration> {
	let mut max_age = None;

	for directive in raw.split(',').map(str::trim) {
		let lower = directive.to_ascii_lowercase();

		if lower == "no-store" || lower == "no-cache" {
			return Some(Duration::ZERO);
		}
		if let Some(value) = lower.strip_prefix("max-age=") {
			let secs = value.trim_matches('"').parse::<i64>().ok()?;

			max_age = Some(Duration::seconds(secs.max(0)));
		}
	}

	max_age
}
