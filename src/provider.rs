//! Provider-facing options (data), vendor presets (fixed overlays), and the resolved config.
//!
//! `options` exposes [`CallerOptions`], the caller's configuration surface. `preset` holds
//! [`VendorPreset`] overlays plus the Azure Active Directory presets. `builder` merges options,
//! presets, and discovery metadata into an immutable [`ProviderConfig`] (see `config`).

pub mod builder;
pub mod config;
pub mod flow;
pub mod options;
pub mod preset;

pub use builder::*;
pub use config::*;
pub use flow::*;
pub use options::*;
pub use preset::*;
