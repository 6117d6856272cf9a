//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types used across all Bazaar components:
//! - `api` - HTTP backend (catalog, seller feeds, baskets and orders)
//! - `cli` - Command-line tools for migrations, accounts and offline imports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding is behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - ID newtypes, emails, account and order states, policies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
