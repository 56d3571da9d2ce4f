//! Caller-supplied provider options.

// self
use crate::{
	_prelude::*,
	auth::{ClientSecret, TenantId},
	provider::FlowType,
};

/// Caller-supplied provider options.
///
/// Every field is optional so the config builder can tell an explicit caller choice apart
/// from "not set"; explicit values always win over vendor presets, discovery, and library
/// defaults. Setters consume the options and return the next snapshot, and the type is
/// `Clone` so a base configuration can be branched without sharing mutable state. Options
/// also deserialize from configuration files (unknown keys are rejected).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CallerOptions {
	/// OAuth client identifier.
	pub client_id: Option<String>,
	/// OAuth client secret for confidential clients.
	pub client_secret: Option<ClientSecret>,
	/// Provider site, possibly holding a `{tenant}` placeholder.
	pub site: Option<String>,
	/// Tenant substituted into `{tenant}` placeholders.
	pub tenant: Option<TenantId>,
	/// Flow the configuration is used for.
	pub flow: Option<FlowType>,
	/// Authorization endpoint, absolute or relative to the site.
	pub authorization_path: Option<String>,
	/// Token endpoint, absolute or relative to the site.
	pub token_path: Option<String>,
	/// JWKS endpoint, absolute or relative to the site.
	pub jwks_uri: Option<String>,
	/// Character used to join scopes.
	pub scope_separator: Option<char>,
	/// Extra parameters sent with provider requests.
	pub extra_parameters: BTreeMap<String, String>,
	/// Whether a discovered issuer must match the site.
	pub validate_issuer: Option<bool>,
	/// Whether endpoints should be resolved through OpenID Connect discovery.
	pub discover: Option<bool>,
	/// Custom discovery path, relative to the site.
	pub well_known_path: Option<String>,
}
impl CallerOptions {
	/// Creates options for the provided client identifier.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: Some(client_id.into()), ..Default::default() }
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<ClientSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the provider site.
	pub fn site(mut self, site: impl Into<String>) -> Self {
		self.site = Some(site.into());

		self
	}

	/// Sets the tenant used for placeholder substitution.
	pub fn tenant(mut self, tenant: TenantId) -> Self {
		self.tenant = Some(tenant);

		self
	}

	/// Sets the flow.
	pub fn flow(mut self, flow: FlowType) -> Self {
		self.flow = Some(flow);

		self
	}

	/// Sets the authorization endpoint or path.
	pub fn authorization_path(mut self, path: impl Into<String>) -> Self {
		self.authorization_path = Some(path.into());

		self
	}

	/// Sets the token endpoint or path.
	pub fn token_path(mut self, path: impl Into<String>) -> Self {
		self.token_path = Some(path.into());

		self
	}

	/// Sets the JWKS endpoint or path.
	pub fn jwks_uri(mut self, uri: impl Into<String>) -> Self {
		self.jwks_uri = Some(uri.into());

		self
	}

	/// Sets the scope separator.
	pub fn scope_separator(mut self, separator: char) -> Self {
		self.scope_separator = Some(separator);

		self
	}

	/// Adds or replaces a single extra parameter.
	pub fn extra_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_parameters.insert(key.into(), value.into());

		self
	}

	/// Adds or replaces several extra parameters.
	pub fn extra_parameters<I, K, V>(mut self, parameters: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (key, value) in parameters {
			self.extra_parameters.insert(key.into(), value.into());
		}

		self
	}

	/// Sets whether the discovered issuer must match the site.
	pub fn validate_issuer(mut self, validate: bool) -> Self {
		self.validate_issuer = Some(validate);

		self
	}

	/// Requests (or suppresses) OpenID Connect discovery.
	pub fn discover(mut self, discover: bool) -> Self {
		self.discover = Some(discover);

		self
	}

	/// Sets a custom discovery path.
	pub fn well_known_path(mut self, path: impl Into<String>) -> Self {
		self.well_known_path = Some(path.into());

		self
	}

	/// Returns true when endpoints must come from a discovery document.
	pub fn requests_discovery(&self) -> bool {
		self.discover.unwrap_or(false)
	}
}
