//! Identity-domain identifiers and client credential wrappers.

pub mod id;
pub mod secret;

pub use id::*;
pub use secret::*;
