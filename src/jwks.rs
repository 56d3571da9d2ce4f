//! JSON Web Key Sets: parsed verification keys and the single-flight cache that holds them.

pub mod cache;
pub mod key;

pub use cache::*;
pub use key::*;
