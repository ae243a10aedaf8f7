//! Shared utilities used across the relay.

pub mod status_text;

pub use status_text::status_text;
