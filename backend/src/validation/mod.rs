//! Field rules shared by the request payloads.

pub mod rules;

pub use validator::Validate;
