//! The immutable provider configuration handed to token-flow collaborators.

// crates.io
use oauth2::{
	AuthUrl, ClientId, ClientSecret as OAuthClientSecret, EndpointNotSet, EndpointSet, TokenUrl,
	basic::BasicClient,
};
// self
use crate::{
	_prelude::*,
	auth::{ClientSecret, ProviderId, TenantId},
	provider::FlowType,
};

/// `oauth2` client with the authorization and token endpoints set.
pub type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Resolved endpoint set of a provider configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint.
	pub authorization: Url,
	/// Token endpoint.
	pub token: Url,
	/// JWKS endpoint, when known.
	pub jwks: Option<Url>,
	/// UserInfo endpoint, when discovered.
	pub userinfo: Option<Url>,
	/// RP-initiated logout endpoint, when discovered.
	pub end_session: Option<Url>,
	/// Revocation endpoint, when discovered.
	pub revocation: Option<Url>,
	/// Introspection endpoint, when discovered.
	pub introspection: Option<Url>,
}

/// Immutable, validated provider configuration.
///
/// Values are only produced by [`ProviderConfig::build`](crate::provider::ProviderConfig::build);
/// every override happens during that merge and the result is never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
	pub(crate) id: Option<ProviderId>,
	pub(crate) site: Url,
	pub(crate) authorization_path: String,
	pub(crate) token_path: String,
	pub(crate) client_id: String,
	pub(crate) client_secret: Option<ClientSecret>,
	pub(crate) scope_separator: char,
	pub(crate) extra_parameters: BTreeMap<String, String>,
	pub(crate) validate_issuer: bool,
	pub(crate) flow: FlowType,
	pub(crate) tenant: Option<TenantId>,
	pub(crate) issuer: Option<String>,
	pub(crate) scopes_supported: Option<BTreeSet<String>>,
	pub(crate) endpoints: ProviderEndpoints,
}
impl ProviderConfig {
	/// Preset identifier the configuration was built from, if any.
	pub fn id(&self) -> Option<&ProviderId> {
		self.id.as_ref()
	}

	/// Site with the tenant placeholder substituted.
	pub fn site(&self) -> &Url {
		&self.site
	}

	/// Authorization endpoint as configured (path or absolute URL).
	pub fn authorization_path(&self) -> &str {
		&self.authorization_path
	}

	/// Token endpoint as configured (path or absolute URL).
	pub fn token_path(&self) -> &str {
		&self.token_path
	}

	/// OAuth client identifier.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// OAuth client secret.
	pub fn client_secret(&self) -> Option<&ClientSecret> {
		self.client_secret.as_ref()
	}

	/// Character used to join scopes.
	pub fn scope_separator(&self) -> char {
		self.scope_separator
	}

	/// Extra parameters with tenant placeholders substituted.
	pub fn extra_parameters(&self) -> &BTreeMap<String, String> {
		&self.extra_parameters
	}

	/// Whether tokens must carry the discovered issuer.
	pub fn validate_issuer(&self) -> bool {
		self.validate_issuer
	}

	/// Flow the configuration is used for.
	pub fn flow(&self) -> FlowType {
		self.flow
	}

	/// Tenant the configuration is scoped to.
	pub fn tenant(&self) -> Option<&TenantId> {
		self.tenant.as_ref()
	}

	/// Issuer advertised by discovery.
	pub fn issuer(&self) -> Option<&str> {
		self.issuer.as_deref()
	}

	/// Resolved endpoints.
	pub fn endpoints(&self) -> &ProviderEndpoints {
		&self.endpoints
	}

	/// Returns true when the provider advertises the scope (or advertises no scope list).
	pub fn supports_scope(&self, scope: &str) -> bool {
		self.scopes_supported.as_ref().is_none_or(|scopes| scopes.contains(scope))
	}

	/// Joins scopes with the provider's separator, skipping empty entries.
	pub fn format_scopes<I, S>(&self, scopes: I) -> Option<String>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut buf = String::new();

		for scope in scopes {
			let scope = scope.as_ref().trim();

			if scope.is_empty() {
				continue;
			}
			if !buf.is_empty() {
				buf.push(self.scope_separator);
			}

			buf.push_str(scope);
		}

		if buf.is_empty() { None } else { Some(buf) }
	}

	/// Builds an `oauth2` client with this configuration's endpoints and credentials.
	pub fn oauth2_client(&self) -> ConfiguredBasicClient {
		let client = BasicClient::new(ClientId::new(self.client_id.clone()))
			.set_auth_uri(AuthUrl::from_url(self.endpoints.authorization.clone()))
			.set_token_uri(TokenUrl::from_url(self.endpoints.token.clone()));

		match &self.client_secret {
			Some(secret) =>
				client.set_client_secret(OAuthClientSecret::new(secret.expose().to_owned())),
			None => client,
		}
	}
}
