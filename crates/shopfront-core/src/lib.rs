//! Shopfront Core Library
//!
//! Domain models shared by the cart engine and the admin realtime layer.

pub mod auth;
pub mod cart;
pub mod chat;
pub mod config;
pub mod counters;
pub mod error;
pub mod notice;
pub mod support;

pub use error::{ShopfrontError, ShopfrontResult};
