//! Client secret wrapper that keeps credential material out of logs.

// self
use crate::_prelude::*;

/// Redacted OAuth client secret.
///
/// `Debug` and `Display` never print the value, so configurations holding it can be logged
/// freely.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl From<&str> for ClientSecret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for ClientSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
	}
}
impl Display for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
