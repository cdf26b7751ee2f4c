//! Scribeflow - audio transcription pipeline with API key rotation
//!
//! This library crate exposes the core functionality for integration testing.

pub mod app;
pub mod config;
pub mod inbox;
pub mod inference;
pub mod outcome_log;
pub mod stages;
pub mod transcode;
