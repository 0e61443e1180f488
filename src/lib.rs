//! Tooling for Assemblyline-style analysis services: manifest validation,
//! a service SDK and a runner that processes one task outside the platform.

// The manifest schema literal nests deeper than `json!` allows by default.
#![recursion_limit = "256"]

pub mod cli;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod result;
pub mod runner;
pub mod service;
pub mod task;
pub mod utils;

pub use errors::ServiceKitError;
