//! Public verification keys parsed from JWKS documents.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::KeyId, error::DocumentError, http::FetchedDocument};

const EC_CURVES: [&str; 3] = ["P-256", "P-384", "P-521"];
const OKP_CURVES: [&str; 4] = ["Ed25519", "Ed448", "X25519", "X448"];

/// Decoded public key material by key type.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
	/// RSA public key.
	Rsa {
		/// Modulus, big-endian.
		n: Vec<u8>,
		/// Public exponent, big-endian.
		e: Vec<u8>,
	},
	/// Elliptic-curve public key.
	Ec {
		/// Curve name (`P-256`, `P-384`, `P-521`).
		crv: String,
		/// X coordinate.
		x: Vec<u8>,
		/// Y coordinate.
		y: Vec<u8>,
	},
	/// Octet key pair (EdDSA / ECDH) public key.
	Okp {
		/// Curve name (`Ed25519`, `Ed448`, `X25519`, `X448`).
		crv: String,
		/// Public key bytes.
		x: Vec<u8>,
	},
}
impl KeyMaterial {
	/// Returns the JWK `kty` value.
	pub const fn kty(&self) -> &'static str {
		match self {
			KeyMaterial::Rsa { .. } => "RSA",
			KeyMaterial::Ec { .. } => "EC",
			KeyMaterial::Okp { .. } => "OKP",
		}
	}

	/// RFC 7638 SHA-256 thumbprint, base64url encoded.
	pub fn thumbprint(&self) -> String {
		// Required members only, lexicographic order, no whitespace.
		let canonical = match self {
			KeyMaterial::Rsa { n, e } => format!(
				r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
				URL_SAFE_NO_PAD.encode(e),
				URL_SAFE_NO_PAD.encode(n)
			),
			KeyMaterial::Ec { crv, x, y } => format!(
				r#"{{"crv":"{crv}","kty":"EC","x":"{}","y":"{}"}}"#,
				URL_SAFE_NO_PAD.encode(x),
				URL_SAFE_NO_PAD.encode(y)
			),
			KeyMaterial::Okp { crv, x } =>
				format!(r#"{{"crv":"{crv}","kty":"OKP","x":"{}"}}"#, URL_SAFE_NO_PAD.encode(x)),
		};

		URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
	}
}
impl Debug for KeyMaterial {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			KeyMaterial::Rsa { n, .. } =>
				f.debug_struct("Rsa").field("bits", &(n.len() * 8)).finish_non_exhaustive(),
			KeyMaterial::Ec { crv, .. } => f.debug_struct("Ec").field("crv", crv).finish_non_exhaustive(),
			KeyMaterial::Okp { crv, .. } =>
				f.debug_struct("Okp").field("crv", crv).finish_non_exhaustive(),
		}
	}
}

/// A public verification key indexed by key identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationKey {
	/// Key identifier (`kid`, or the RFC 7638 thumbprint when the entry has none).
	pub kid: KeyId,
	/// Declared JWS algorithm, if any.
	pub alg: Option<String>,
	/// Declared public key use (`sig`, `enc`), if any.
	pub key_use: Option<String>,
	/// Decoded key material.
	pub material: KeyMaterial,
}
impl VerificationKey {
	/// Returns the JWK `kty` value.
	pub fn kty(&self) -> &'static str {
		self.material.kty()
	}
}

/// Immutable snapshot of a JWKS document.
///
/// A refresh replaces the whole set; individual keys are never added or removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySet {
	keys: BTreeMap<KeyId, VerificationKey>,
	fetched_at: OffsetDateTime,
	ttl: Option<Duration>,
	skipped: usize,
}
impl KeySet {
	/// Parses a JWKS body.
	///
	/// A body that is not a `{"keys": [...]}` document fails as a whole. Individual entries
	/// with an unsupported type, missing members, or invalid base64url are skipped.
	pub fn from_slice(
		body: &[u8],
		fetched_at: OffsetDateTime,
		ttl: Option<Duration>,
	) -> Result<Self, DocumentError> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let raw: RawKeySet = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| DocumentError::Parse { source })?;
		let mut keys = BTreeMap::new();
		let mut skipped = 0;

		for (index, entry) in raw.keys.into_iter().enumerate() {
			match parse_entry(entry) {
				Ok(key) =>
					if keys.contains_key(&key.kid) {
						skipped += 1;

						#[cfg(feature = "tracing")]
						tracing::warn!(index, kid = %key.kid, "Skipping JWKS entry with a duplicate key id.");
					} else {
						keys.insert(key.kid.clone(), key);
					},
				Err(reason) => {
					skipped += 1;

					#[cfg(feature = "tracing")]
					tracing::warn!(index, reason, "Skipping malformed JWKS entry.");
					#[cfg(not(feature = "tracing"))]
					let _ = (index, reason);
				},
			}
		}

		Ok(Self { keys, fetched_at, ttl, skipped })
	}

	pub(crate) fn from_document(document: &FetchedDocument) -> Result<Self, DocumentError> {
		Self::from_slice(&document.body, OffsetDateTime::now_utc(), document.metadata.max_age)
	}

	/// Looks up a key by identifier.
	pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
		self.keys.get(kid)
	}

	/// Iterates keys ordered by identifier.
	pub fn keys(&self) -> impl Iterator<Item = &VerificationKey> {
		self.keys.values()
	}

	/// Number of usable keys.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Returns true when no entry was usable.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// Number of entries that were skipped while parsing.
	pub fn skipped(&self) -> usize {
		self.skipped
	}

	/// When the document was fetched.
	pub fn fetched_at(&self) -> OffsetDateTime {
		self.fetched_at
	}

	/// Lifetime advertised by the JWKS response (`Cache-Control: max-age`).
	pub fn ttl(&self) -> Option<Duration> {
		self.ttl
	}

	/// Returns true once `ttl` has elapsed since the fetch.
	pub fn is_stale(&self, ttl: Duration) -> bool {
		self.is_stale_at(ttl, OffsetDateTime::now_utc())
	}

	/// Same as [`KeySet::is_stale`] against an explicit clock reading.
	pub fn is_stale_at(&self, ttl: Duration, now: OffsetDateTime) -> bool {
		now - self.fetched_at >= ttl
	}

	/// Returns true once the advertised lifetime has elapsed; sets without one never expire.
	pub fn is_expired(&self) -> bool {
		self.ttl.is_some_and(|ttl| self.is_stale(ttl))
	}
}

#[derive(Deserialize)]
struct RawKeySet {
	keys: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawJwk {
	kty: Option<String>,
	kid: Option<String>,
	alg: Option<String>,
	#[serde(rename = "use")]
	key_use: Option<String>,
	n: Option<String>,
	e: Option<String>,
	crv: Option<String>,
	x: Option<String>,
	y: Option<String>,
}

fn parse_entry(entry: serde_json::Value) -> Result<VerificationKey, &'static str> {
	let raw: RawJwk = serde_json::from_value(entry).map_err(|_| "entry is not a JWK object")?;
	let material = match raw.kty.as_deref() {
		Some("RSA") => KeyMaterial::Rsa {
			n: decode_member(raw.n.as_deref(), "missing or invalid `n`")?,
			e: decode_member(raw.e.as_deref(), "missing or invalid `e`")?,
		},
		Some("EC") => KeyMaterial::Ec {
			crv: curve(raw.crv, &EC_CURVES)?,
			x: decode_member(raw.x.as_deref(), "missing or invalid `x`")?,
			y: decode_member(raw.y.as_deref(), "missing or invalid `y`")?,
		},
		Some("OKP") => KeyMaterial::Okp {
			crv: curve(raw.crv, &OKP_CURVES)?,
			x: decode_member(raw.x.as_deref(), "missing or invalid `x`")?,
		},
		Some("oct") => return Err("symmetric keys are not verification keys"),
		Some(_) => return Err("unsupported key type"),
		None => return Err("missing `kty`"),
	};
	let kid = match raw.kid {
		Some(kid) => KeyId::new(kid).map_err(|_| "invalid `kid`")?,
		None => KeyId::new_unchecked(material.thumbprint()),
	};

	Ok(VerificationKey { kid, alg: raw.alg, key_use: raw.key_use, material })
}

fn decode_member(value: Option<&str>, reason: &'static str) -> Result<Vec<u8>, &'static str> {
	let value = value.filter(|value| !value.is_empty()).ok_or(reason)?;

	URL_SAFE_NO_PAD.decode(value).map_err(|_| reason)
}

fn curve(crv: Option<String>, known: &[&str]) -> Result<String, &'static str> {
	match crv {
		Some(crv) if known.contains(&crv.as_str()) => Ok(crv),
		Some(_) => Err("unsupported curve"),
		None => Err("missing `crv`"),
	}
}
