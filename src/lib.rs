//! Library exports for sessiongate, shared between the binary and tests.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;
