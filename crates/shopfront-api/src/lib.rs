//! Shopfront API Client
//!
//! Typed REST client for the storefront backend. The backend is treated as a
//! black box: this crate only knows the request/response contract.

pub mod client;

pub use client::ApiClient;
