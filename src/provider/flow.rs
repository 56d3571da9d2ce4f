//! OAuth 2.0 flow selection for provider configurations.

// self
use crate::_prelude::*;

/// OAuth 2.0 flows a provider configuration can be used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
	/// Authorization Code grant.
	#[default]
	AuthCode,
	/// JWT bearer assertion grant, used in on-behalf-of mode.
	AuthJwt,
	/// Client Credentials grant for app-only tokens.
	Client,
	/// Resource Owner Password Credentials grant.
	Password,
	/// Implicit grant; tokens come straight from the authorization endpoint.
	Implicit,
}
impl FlowType {
	/// Returns a stable label suitable for logs and config files.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowType::AuthCode => "AUTH_CODE",
			FlowType::AuthJwt => "AUTH_JWT",
			FlowType::Client => "CLIENT",
			FlowType::Password => "PASSWORD",
			FlowType::Implicit => "IMPLICIT",
		}
	}

	/// Returns the `grant_type` identifier sent to the token endpoint, if the flow uses one.
	pub const fn grant_type(self) -> Option<&'static str> {
		match self {
			FlowType::AuthCode => Some("authorization_code"),
			FlowType::AuthJwt => Some("urn:ietf:params:oauth:grant-type:jwt-bearer"),
			FlowType::Client => Some("client_credentials"),
			FlowType::Password => Some("password"),
			FlowType::Implicit => None,
		}
	}
}
impl Display for FlowType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
