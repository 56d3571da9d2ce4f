//! Vendor presets: fixed-field overlays applied beneath caller options.
//!
//! A preset is plain data. New vendors are added by writing another constructor that returns
//! a [`VendorPreset`]; there is no per-vendor behavior in the builder.

// self
use crate::{
	_prelude::*,
	auth::{ClientSecret, ProviderId, TenantId},
	provider::{CallerOptions, FlowType},
};

/// Fixed fields a vendor imposes unless the caller sets them explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPreset {
	/// Preset identifier.
	pub id: ProviderId,
	/// Site template, possibly holding a `{tenant}` placeholder.
	pub site: Option<String>,
	/// Authorization endpoint or path.
	pub authorization_path: Option<String>,
	/// Token endpoint or path.
	pub token_path: Option<String>,
	/// Flow the preset is meant for.
	pub flow: Option<FlowType>,
	/// Scope separator used by the vendor.
	pub scope_separator: Option<char>,
	/// Extra parameters; caller keys override preset keys one by one.
	pub extra_parameters: BTreeMap<String, String>,
	/// Issuer validation choice for discovery-based configurations.
	pub validate_issuer: Option<bool>,
	/// Whether the preset resolves endpoints through discovery.
	pub discover: Option<bool>,
	/// Vendor-specific discovery path.
	pub well_known_path: Option<String>,
}
impl VendorPreset {
	/// Creates an empty preset with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			site: None,
			authorization_path: None,
			token_path: None,
			flow: None,
			scope_separator: None,
			extra_parameters: BTreeMap::new(),
			validate_issuer: None,
			discover: None,
			well_known_path: None,
		}
	}

	/// Sets the site template.
	pub fn site(mut self, site: impl Into<String>) -> Self {
		self.site = Some(site.into());

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

	/// Sets the flow.
	pub fn flow(mut self, flow: FlowType) -> Self {
		self.flow = Some(flow);

		self
	}

	/// Sets the scope separator.
	pub fn scope_separator(mut self, separator: char) -> Self {
		self.scope_separator = Some(separator);

		self
	}

	/// Adds a fixed extra parameter.
	pub fn extra_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_parameters.insert(key.into(), value.into());

		self
	}

	/// Sets the issuer validation choice.
	pub fn validate_issuer(mut self, validate: bool) -> Self {
		self.validate_issuer = Some(validate);

		self
	}

	/// Marks the preset as discovery-based.
	pub fn discover(mut self, discover: bool) -> Self {
		self.discover = Some(discover);

		self
	}

	/// Sets a vendor-specific discovery path.
	pub fn well_known_path(mut self, path: impl Into<String>) -> Self {
		self.well_known_path = Some(path.into());

		self
	}

	/// Fills every field the caller left unset and returns the resulting snapshot.
	pub fn overlay(&self, options: CallerOptions) -> CallerOptions {
		let mut extra_parameters = self.extra_parameters.clone();

		extra_parameters.extend(options.extra_parameters);

		CallerOptions {
			client_id: options.client_id,
			client_secret: options.client_secret,
			site: options.site.or_else(|| self.site.clone()),
			tenant: options.tenant,
			flow: options.flow.or(self.flow),
			authorization_path: options
				.authorization_path
				.or_else(|| self.authorization_path.clone()),
			token_path: options.token_path.or_else(|| self.token_path.clone()),
			jwks_uri: options.jwks_uri,
			scope_separator: options.scope_separator.or(self.scope_separator),
			extra_parameters,
			validate_issuer: options.validate_issuer.or(self.validate_issuer),
			discover: options.discover.or(self.discover),
			well_known_path: options.well_known_path.or_else(|| self.well_known_path.clone()),
		}
	}
}

/// Presets for Microsoft Azure Active Directory (v1 endpoints).
#[derive(Clone, Copy, Debug, Default)]
pub struct AzureAd;
impl AzureAd {
	/// Preset identifier.
	pub const ID: &'static str = "azure-ad";
	/// Tenant-scoped site template.
	pub const SITE: &'static str = "https://login.windows.net/{tenant}";
	/// Multi-tenant site used for discovery when the caller sets none.
	pub const DISCOVERY_SITE: &'static str = "https://login.windows.net/common";
	/// Token path relative to the site.
	pub const TOKEN_PATH: &'static str = "/oauth2/token";
	/// Authorization path relative to the site.
	pub const AUTHORIZATION_PATH: &'static str = "/oauth2/authorize";
	/// Scope separator expected by Azure AD.
	pub const SCOPE_SEPARATOR: char = ',';

	/// Fixed-endpoint preset: tenant site template, v1 paths, and `resource={tenant}`.
	pub fn preset() -> VendorPreset {
		VendorPreset::new(Self::id())
			.flow(FlowType::AuthCode)
			.site(Self::SITE)
			.token_path(Self::TOKEN_PATH)
			.authorization_path(Self::AUTHORIZATION_PATH)
			.scope_separator(Self::SCOPE_SEPARATOR)
			.extra_parameter("resource", "{tenant}")
	}

	/// Discovery preset.
	///
	/// Azure's discovery document advertises an issuer that differs from the site the
	/// request was sent to, so issuer validation is turned off unless the caller insists.
	pub fn discovery_preset() -> VendorPreset {
		VendorPreset::new(Self::id())
			.discover(true)
			.site(Self::DISCOVERY_SITE)
			.validate_issuer(false)
			.scope_separator(Self::SCOPE_SEPARATOR)
			.extra_parameter("resource", "{tenant}")
	}

	/// Fully populated options for the fixed-endpoint preset.
	pub fn options(
		client_id: impl Into<String>,
		client_secret: impl Into<ClientSecret>,
		tenant: TenantId,
	) -> CallerOptions {
		Self::preset()
			.overlay(CallerOptions::new(client_id).client_secret(client_secret).tenant(tenant))
	}

	fn id() -> ProviderId {
		ProviderId::new_unchecked(Self::ID)
	}
}
