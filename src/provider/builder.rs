//! Merge of caller options, vendor presets, and discovery metadata into a [`ProviderConfig`].
//!
//! Precedence, highest first: explicit caller field, vendor preset field, discovered metadata,
//! library default. The merge is a pure function of its inputs.

// self
use crate::{
	_prelude::*,
	auth::TenantId,
	discovery::{self, DiscoveryMetadata, WELL_KNOWN_PATH},
	error::{ConfigError, DocumentError},
	provider::{CallerOptions, FlowType, ProviderConfig, ProviderEndpoints, VendorPreset},
};

/// Placeholder substituted with the caller's tenant.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";
/// Authorization path used when nothing else supplies one.
pub const DEFAULT_AUTHORIZATION_PATH: &str = "/oauth/authorize";
/// Token path used when nothing else supplies one.
pub const DEFAULT_TOKEN_PATH: &str = "/oauth/token";
/// Scope separator used when nothing else supplies one.
pub const DEFAULT_SCOPE_SEPARATOR: char = ' ';

const REQUESTED_TOKEN_USE: &str = "requested_token_use";
const ON_BEHALF_OF: &str = "on_behalf_of";

impl ProviderConfig {
	/// Merges `options`, an optional `preset`, and optional discovery `metadata`.
	///
	/// Tenant placeholders in the site and in extra parameter values are substituted in a
	/// single pass. [`FlowType::AuthJwt`] always adds `requested_token_use=on_behalf_of`.
	/// With discovery metadata and issuer validation on, the advertised issuer must match the
	/// site.
	pub fn build(
		options: &CallerOptions,
		metadata: Option<&DiscoveryMetadata>,
		preset: Option<&VendorPreset>,
	) -> Result<Self> {
		let options = match preset {
			Some(preset) => preset.overlay(options.clone()),
			None => options.clone(),
		};
		let client_id = options
			.client_id
			.clone()
			.filter(|id| !id.trim().is_empty())
			.ok_or(ConfigError::MissingClientId)?;
		let tenant = options.tenant.as_ref();
		let site = match (options.site.is_some(), metadata) {
			(true, _) => effective_site(&options)?,
			(false, Some(metadata)) => parse_site(&metadata.issuer, tenant)?,
			(false, None) => return Err(ConfigError::MissingSite.into()),
		};
		let validate_issuer = options.validate_issuer.unwrap_or(true);

		if let Some(metadata) = metadata.filter(|_| validate_issuer) {
			ensure_issuer_matches(metadata, &site)?;
		}

		let authorization_path = options
			.authorization_path
			.or_else(|| metadata.map(|m| m.authorization_endpoint.to_string()))
			.unwrap_or_else(|| DEFAULT_AUTHORIZATION_PATH.to_owned());
		let token_path = options
			.token_path
			.or_else(|| metadata.map(|m| m.token_endpoint.to_string()))
			.unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_owned());
		let jwks = match options.jwks_uri.as_deref() {
			Some(uri) => Some(resolve_endpoint(&site, uri, "jwks_uri")?),
			None => metadata.and_then(|m| m.jwks_uri.clone()),
		};
		let endpoints = ProviderEndpoints {
			authorization: resolve_endpoint(&site, &authorization_path, "authorization_path")?,
			token: resolve_endpoint(&site, &token_path, "token_path")?,
			jwks,
			userinfo: metadata.and_then(|m| m.userinfo_endpoint.clone()),
			end_session: metadata.and_then(|m| m.end_session_endpoint.clone()),
			revocation: metadata.and_then(|m| m.revocation_endpoint.clone()),
			introspection: metadata.and_then(|m| m.introspection_endpoint.clone()),
		};
		let scope_separator = options.scope_separator.unwrap_or(DEFAULT_SCOPE_SEPARATOR);

		if scope_separator.is_control() {
			return Err(ConfigError::InvalidScopeSeparator { separator: scope_separator }.into());
		}

		let flow = options.flow.unwrap_or_default();
		let mut extra_parameters = BTreeMap::new();

		for (key, value) in options.extra_parameters {
			let value = substitute_tenant(&format!("extra_parameters.{key}"), &value, tenant)?;

			extra_parameters.insert(key, value);
		}

		if flow == FlowType::AuthJwt {
			extra_parameters.insert(REQUESTED_TOKEN_USE.into(), ON_BEHALF_OF.into());
		}

		Ok(Self {
			id: preset.map(|preset| preset.id.clone()),
			site,
			authorization_path,
			token_path,
			client_id,
			client_secret: options.client_secret,
			scope_separator,
			extra_parameters,
			validate_issuer,
			flow,
			tenant: options.tenant,
			issuer: metadata.map(|m| m.issuer.clone()),
			scopes_supported: metadata.and_then(|m| m.scopes_supported.clone()),
			endpoints,
		})
	}
}

/// Replaces every `{tenant}` in `value` with `tenant`, in one non-recursive pass.
///
/// Returns [`Error::MissingTenant`] naming `field` when a placeholder is present but no tenant
/// was supplied.
pub fn substitute_tenant(field: &str, value: &str, tenant: Option<&TenantId>) -> Result<String> {
	if !value.contains(TENANT_PLACEHOLDER) {
		return Ok(value.to_owned());
	}

	match tenant {
		Some(tenant) => Ok(value.replace(TENANT_PLACEHOLDER, tenant)),
		None => Err(Error::MissingTenant { field: field.to_owned() }),
	}
}

/// Resolves the site a configuration (or its discovery fetch) will use.
///
/// A site given as the full discovery URL is reduced to its base, so the issuer check and
/// site-relative endpoints see the provider root.
pub fn effective_site(options: &CallerOptions) -> Result<Url> {
	let template = options.site.as_deref().ok_or(ConfigError::MissingSite)?;
	let site = parse_site(template, options.tenant.as_ref())?;
	let well_known_path = options.well_known_path.as_deref().unwrap_or(WELL_KNOWN_PATH);

	Ok(discovery::strip_well_known_path(site, well_known_path))
}

fn parse_site(template: &str, tenant: Option<&TenantId>) -> Result<Url> {
	let value = substitute_tenant("site", template.trim(), tenant)?;

	Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { field: "site", value, source }.into())
}

/// Absolute URLs are taken as-is; paths are appended to the site text so tenant segments in
/// the site path survive.
fn resolve_endpoint(site: &Url, path: &str, field: &'static str) -> Result<Url> {
	if let Ok(url) = Url::parse(path) {
		return Ok(url);
	}

	let base = site.as_str().trim_end_matches('/');
	let value = if path.starts_with('/') { format!("{base}{path}") } else { format!("{base}/{path}") };

	Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { field, value, source }.into())
}

fn ensure_issuer_matches(metadata: &DiscoveryMetadata, site: &Url) -> Result<()> {
	let expected = site.as_str().trim_end_matches('/');
	let actual = metadata.issuer.trim_end_matches('/');

	if expected == actual {
		return Ok(());
	}

	Err(Error::DiscoveryInvalid {
		url: metadata.source.clone(),
		source: DocumentError::IssuerMismatch {
			expected: expected.to_owned(),
			actual: metadata.issuer.clone(),
		},
	})
}
