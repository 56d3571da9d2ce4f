//! OpenID Connect discovery, JWKS caching, and vendor presets that resolve into immutable
//! OAuth 2.0 provider configurations.
//!
//! The crate resolves a provider's well-known discovery document, merges it with caller
//! options and vendor presets (such as [`provider::AzureAd`]), and hands back a validated
//! [`provider::ProviderConfig`] together with a single-flight [`jwks::KeySetCache`].
//! Token exchanges stay with downstream flow implementations.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod http;
pub mod jwks;
pub mod obs;
pub mod provider;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		factory::{ProviderFactory, ReqwestProviderFactory},
		http::ReqwestHttpClient,
	};

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`ProviderFactory`] backed by the reqwest transport used across
	/// integration tests.
	pub fn build_reqwest_test_factory() -> ReqwestProviderFactory {
		ProviderFactory::with_http_client(test_reqwest_http_client())
	}

	/// Renders a discovery document whose endpoints live under `base`.
	pub fn discovery_document(base: &str, issuer: &str, with_jwks: bool) -> String {
		let mut document = serde_json::json!({
			"issuer": issuer,
			"authorization_endpoint": format!("{base}/oauth2/authorize"),
			"token_endpoint": format!("{base}/oauth2/token"),
			"userinfo_endpoint": format!("{base}/userinfo"),
			"scopes_supported": ["openid", "profile", "email"],
		});

		if with_jwks {
			document["jwks_uri"] = serde_json::Value::String(format!("{base}/keys"));
		}

		document.to_string()
	}

	/// Renders a JWKS document holding one RSA key per identifier.
	pub fn rsa_key_set_document(kids: &[&str]) -> String {
		let keys = kids
			.iter()
			.map(|kid| {
				serde_json::json!({
					"kty": "RSA",
					"use": "sig",
					"alg": "RS256",
					"kid": kid,
					"n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
					"e": "AQAB",
				})
			})
			.collect::<Vec<_>>();

		serde_json::json!({ "keys": keys }).to_string()
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, ErrorKind, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tokio as _};
