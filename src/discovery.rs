//! OpenID Connect discovery: well-known URL derivation, fetching, and document validation.
//!
//! [`DiscoveryResolver::resolve`] issues exactly one `GET` per call and keeps no cache; the
//! resolved [`DiscoveryMetadata`] is immutable and is consumed by the provider config builder.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, DocumentError},
	http::{self, ProviderHttpClient},
	obs::{self, Stage},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Standard OpenID Connect discovery path.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// Normalized provider metadata taken from a discovery document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryMetadata {
	/// Well-known URL the document was fetched from.
	pub source: Url,
	/// Issuer identifier advertised by the provider.
	pub issuer: String,
	/// Authorization endpoint.
	pub authorization_endpoint: Url,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// JWKS endpoint used for signature verification keys.
	pub jwks_uri: Option<Url>,
	/// UserInfo endpoint.
	pub userinfo_endpoint: Option<Url>,
	/// RP-initiated logout endpoint.
	pub end_session_endpoint: Option<Url>,
	/// Token revocation endpoint.
	pub revocation_endpoint: Option<Url>,
	/// Token introspection endpoint.
	pub introspection_endpoint: Option<Url>,
	/// Scopes the provider claims to support.
	pub scopes_supported: Option<BTreeSet<String>>,
	/// JWS algorithms the provider signs ID tokens with.
	pub id_token_signing_alg_values_supported: Option<Vec<String>>,
}
impl DiscoveryMetadata {
	/// Parses and validates a discovery document body fetched from `source`.
	pub fn from_slice(source: Url, body: &[u8]) -> Result<Self, DocumentError> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let raw: RawDiscoveryDocument = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| DocumentError::Parse { source })?;
		let issuer = required(raw.issuer, "issuer")?;
		let authorization_endpoint = parse_endpoint(
			required(raw.authorization_endpoint, "authorization_endpoint")?,
			"authorization_endpoint",
		)?;
		let token_endpoint =
			parse_endpoint(required(raw.token_endpoint, "token_endpoint")?, "token_endpoint")?;

		Ok(Self {
			source,
			issuer,
			authorization_endpoint,
			token_endpoint,
			jwks_uri: optional_endpoint(raw.jwks_uri, "jwks_uri")?,
			userinfo_endpoint: optional_endpoint(raw.userinfo_endpoint, "userinfo_endpoint")?,
			end_session_endpoint: optional_endpoint(
				raw.end_session_endpoint,
				"end_session_endpoint",
			)?,
			revocation_endpoint: optional_endpoint(raw.revocation_endpoint, "revocation_endpoint")?,
			introspection_endpoint: optional_endpoint(
				raw.introspection_endpoint,
				"introspection_endpoint",
			)?,
			scopes_supported: raw.scopes_supported.map(BTreeSet::from_iter),
			id_token_signing_alg_values_supported: raw.id_token_signing_alg_values_supported,
		})
	}

	/// Returns true when the provider advertises the scope (or advertises no scope list).
	pub fn supports_scope(&self, scope: &str) -> bool {
		self.scopes_supported.as_ref().is_none_or(|scopes| scopes.contains(scope))
	}
}

#[derive(Deserialize)]
struct RawDiscoveryDocument {
	issuer: Option<String>,
	authorization_endpoint: Option<String>,
	token_endpoint: Option<String>,
	jwks_uri: Option<String>,
	userinfo_endpoint: Option<String>,
	end_session_endpoint: Option<String>,
	revocation_endpoint: Option<String>,
	introspection_endpoint: Option<String>,
	scopes_supported: Option<Vec<String>>,
	id_token_signing_alg_values_supported: Option<Vec<String>>,
}

/// Fetches discovery documents over a [`ProviderHttpClient`].
pub struct DiscoveryResolver<C>
where
	C: ?Sized + ProviderHttpClient,
{
	http_client: Arc<C>,
	well_known_path: String,
}
impl<C> DiscoveryResolver<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Creates a resolver that uses the standard well-known path.
	pub fn with_http_client(http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), well_known_path: WELL_KNOWN_PATH.into() }
	}

	/// Overrides the well-known path for vendors that publish metadata elsewhere.
	pub fn with_well_known_path(mut self, path: impl AsRef<str>) -> Self {
		self.well_known_path = normalize_well_known_path(path.as_ref());

		self
	}

	/// Returns the well-known path in use.
	pub fn well_known_path(&self) -> &str {
		&self.well_known_path
	}

	/// Derives the discovery URL for `site`, appending the well-known path unless present.
	pub fn well_known_url(&self, site: &Url) -> Result<Url> {
		let base = site.as_str().trim_end_matches('/');

		if base.ends_with(&self.well_known_path) {
			return Ok(site.clone());
		}

		let value = format!("{base}{}", self.well_known_path);

		Url::parse(&value).map_err(|source| {
			ConfigError::InvalidUrl { field: "well_known_path", value, source }.into()
		})
	}

	/// Fetches and validates the discovery document published for `site`.
	pub async fn resolve(&self, site: &Url) -> Result<DiscoveryMetadata> {
		obs::observe(Stage::Discovery, "resolve", async move {
			let url = self.well_known_url(site)?;
			let document = match http::fetch_document(self.http_client.as_ref(), &url).await {
				Ok(document) => document,
				Err(source) => return Err(Error::DiscoveryUnavailable { url, source }),
			};

			DiscoveryMetadata::from_slice(url.clone(), &document.body)
				.map_err(|source| Error::DiscoveryInvalid { url, source })
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl DiscoveryResolver<ReqwestHttpClient> {
	/// Creates a resolver backed by a default reqwest client.
	pub fn new() -> Self {
		Self::with_http_client(ReqwestHttpClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl Default for DiscoveryResolver<ReqwestHttpClient> {
	fn default() -> Self {
		Self::new()
	}
}
impl<C> Clone for DiscoveryResolver<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn clone(&self) -> Self {
		Self { http_client: self.http_client.clone(), well_known_path: self.well_known_path.clone() }
	}
}
impl<C> Debug for DiscoveryResolver<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DiscoveryResolver").field("well_known_path", &self.well_known_path).finish()
	}
}

/// Returns `site` without a trailing `well_known_path`, i.e. the provider base URL.
///
/// Sites given as the full discovery URL resolve to the same provider as their base.
pub fn strip_well_known_path(mut site: Url, well_known_path: &str) -> Url {
	let suffix = normalize_well_known_path(well_known_path);

	if let Some(base) = site.path().trim_end_matches('/').strip_suffix(suffix.as_str()) {
		let base = base.to_owned();

		site.set_path(&base);
	}

	site
}

fn normalize_well_known_path(path: &str) -> String {
	let path = path.trim();

	if path.starts_with('/') { path.to_owned() } else { format!("/{path}") }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, DocumentError> {
	match value {
		Some(value) if !value.trim().is_empty() => Ok(value),
		_ => Err(DocumentError::MissingField { field }),
	}
}

fn parse_endpoint(value: String, field: &'static str) -> Result<Url, DocumentError> {
	Url::parse(value.trim()).map_err(|source| DocumentError::InvalidUrl { field, source })
}

fn optional_endpoint(
	value: Option<String>,
	field: &'static str,
) -> Result<Option<Url>, DocumentError> {
	match value {
		Some(value) if !value.trim().is_empty() => parse_endpoint(value, field).map(Some),
		_ => Ok(None),
	}
}
