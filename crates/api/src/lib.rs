//! Bazaar marketplace backend library.
//!
//! The binary in `main.rs` serves the HTTP API. The library is shared with
//! `bazaar-cli`, which imports feeds offline through the same parser and
//! reconciler.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
