//! Crate-level error types shared by discovery, configuration building, and key caching.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every failure short-circuits provider construction; no partially usable configuration is
/// ever handed back alongside an error.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The discovery document could not be fetched.
	#[error("Discovery document at {url} is unavailable.")]
	DiscoveryUnavailable {
		/// Well-known URL that was requested.
		url: Url,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
	/// The discovery document was fetched but is malformed or incomplete.
	#[error("Discovery document at {url} is invalid.")]
	DiscoveryInvalid {
		/// Well-known URL that served the document.
		url: Url,
		/// Document-level failure.
		#[source]
		source: DocumentError,
	},
	/// A `{tenant}` placeholder is present but no tenant was supplied.
	#[error("Field `{field}` contains a tenant placeholder but no tenant was supplied.")]
	MissingTenant {
		/// Field holding the unresolved placeholder.
		field: String,
	},
	/// The JWKS document could not be fetched or parsed at all.
	#[error("Key set at {url} is unavailable.")]
	KeySetUnavailable {
		/// JWKS URL that was requested.
		url: Url,
		/// Shared failure observed by every waiter of the same refresh.
		#[source]
		source: Arc<KeySetFailure>,
	},
	/// The key set was refreshed but still holds no key with the requested identifier.
	#[error("Key set does not contain key `{kid}`.")]
	UnknownKey {
		/// Requested key identifier.
		kid: String,
	},
	/// The operation was cancelled before it completed.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns the payload-free classification of the error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Config(_) => ErrorKind::Config,
			Self::DiscoveryUnavailable { .. } => ErrorKind::DiscoveryUnavailable,
			Self::DiscoveryInvalid { .. } => ErrorKind::DiscoveryInvalid,
			Self::MissingTenant { .. } => ErrorKind::MissingTenant,
			Self::KeySetUnavailable { .. } => ErrorKind::KeySetUnavailable,
			Self::UnknownKey { .. } => ErrorKind::UnknownKey,
			Self::Cancelled => ErrorKind::Cancelled,
		}
	}
}

impl From<crate::auth::IdentifierError> for Error {
	fn from(e: crate::auth::IdentifierError) -> Self {
		ConfigError::from(e).into()
	}
}

/// Payload-free error classification used for state labels and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::Config`].
	Config,
	/// See [`Error::DiscoveryUnavailable`].
	DiscoveryUnavailable,
	/// See [`Error::DiscoveryInvalid`].
	DiscoveryInvalid,
	/// See [`Error::MissingTenant`].
	MissingTenant,
	/// See [`Error::KeySetUnavailable`].
	KeySetUnavailable,
	/// See [`Error::UnknownKey`].
	UnknownKey,
	/// See [`Error::Cancelled`].
	Cancelled,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::Config => "config",
			ErrorKind::DiscoveryUnavailable => "discovery_unavailable",
			ErrorKind::DiscoveryInvalid => "discovery_invalid",
			ErrorKind::MissingTenant => "missing_tenant",
			ErrorKind::KeySetUnavailable => "key_set_unavailable",
			ErrorKind::UnknownKey => "unknown_key",
			ErrorKind::Cancelled => "cancelled",
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised before any network call.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No client identifier was supplied.
	#[error("Client identifier is required.")]
	MissingClientId,
	/// Neither caller, preset, nor discovery supplied a site.
	#[error("Provider site is required.")]
	MissingSite,
	/// A site or endpoint does not form a valid URL.
	#[error("The {field} value is not a valid URL: {value}.")]
	InvalidUrl {
		/// Field that failed to parse.
		field: &'static str,
		/// Offending value after tenant substitution.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Reject scope separators that are control characters.
	#[error("Scope separator must be a printable character.")]
	InvalidScopeSeparator {
		/// Invalid separator that was supplied.
		separator: char,
	},
	/// An identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, unexpected HTTP status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while fetching the document.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The outgoing request could not be constructed.
	#[error("HTTP request could not be constructed.")]
	Request(#[from] oauth2::http::Error),
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while fetching the document.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a structured error.
	#[error("HTTP client failed: {message}.")]
	Other {
		/// Transport-supplied description.
		message: String,
	},
	/// The endpoint answered with a non-success status.
	#[error("Endpoint answered with HTTP status {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Failures raised while interpreting a fetched JSON document.
#[derive(Debug, ThisError)]
pub enum DocumentError {
	/// The body is not the expected JSON structure.
	#[error("Document could not be parsed.")]
	Parse {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required member is absent or empty.
	#[error("Document is missing the required `{field}` member.")]
	MissingField {
		/// Member name.
		field: &'static str,
	},
	/// An endpoint member does not hold a valid URL.
	#[error("Document member `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Member name.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The advertised issuer does not match the site the document was requested from.
	#[error("Issuer `{actual}` does not match the expected `{expected}`.")]
	IssuerMismatch {
		/// Issuer derived from the configured site.
		expected: String,
		/// Issuer advertised by the document.
		actual: String,
	},
}

/// Reason a key set refresh failed as a whole.
#[derive(Debug, ThisError)]
pub enum KeySetFailure {
	/// The JWKS endpoint could not be reached or answered with an error status.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The JWKS body is not a key set document at all.
	#[error(transparent)]
	Document(#[from] DocumentError),
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn kinds_follow_variants() {
		assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
		assert_eq!(
			Error::MissingTenant { field: "site".into() }.kind().as_str(),
			"missing_tenant"
		);
		assert_eq!(Error::from(ConfigError::MissingClientId).kind(), ErrorKind::Config);
		assert_eq!(
			Error::from(crate::auth::TenantId::new("").expect_err("Empty tenants are invalid.")).kind(),
			ErrorKind::Config
		);
	}

	#[test]
	fn key_set_failures_keep_their_source_chain() {
		let url = Url::parse("https://login.example.com/keys").expect("Fixture URL should parse.");
		let err = Error::KeySetUnavailable {
			url,
			source: Arc::new(KeySetFailure::from(TransportError::UnexpectedStatus {
				status: 503,
				retry_after: None,
			})),
		};
		let source = err.source().expect("Key set errors should expose their source.");

		assert_eq!(source.to_string(), "Endpoint answered with HTTP status 503.");
	}
}
