//! Common types for scribeflow.
//!
//! This crate provides the unified error type plus the two values that flow
//! through every layer of the pipeline:
//!
//! - [`Credential`]: an API key whose value is never printed
//! - [`WorkItem`]: one unit of fan-out work (a media segment on disk)

pub mod credential;
pub mod error;
pub mod item;

pub use credential::Credential;
pub use error::{Error, Result};
pub use item::WorkItem;
