//! Pledge-RS Library
//!
//! A cancellable asynchronous result runtime ([`monad`]) and the
//! authentication backend built on it.

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod monad;
pub mod presentation;
pub mod repositories;
pub mod services;
pub mod use_cases;
pub mod utils;

pub fn pkg_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
