//! Shared utilities for the alphabet-reduction core: interned
//! identifiers, the crate-wide error type, and a fresh-name generator
//! for equations synthesized by the push rewriters.
mod errors;
mod id;
mod namegen;

pub use errors::{AlphaResult, Error};
pub use id::{GSym, GetName, Id};
pub use namegen::NameGenerator;
