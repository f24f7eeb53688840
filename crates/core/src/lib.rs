//! Touchline Core - Shared types library.
//!
//! This crate provides common types used across all Touchline components:
//! - `portal` - Role-based academy portal (web binary)
//! - `integration-tests` - End-to-end tests against a running portal
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no template
//! rendering. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, and the capability table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
