//! Shared types for the WorldCat holdings client workspace

pub mod error;
pub mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
