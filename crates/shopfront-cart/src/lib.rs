//! Shopfront Cart Engine
//!
//! Single source of truth for the shopping cart. The remote-vs-local storage
//! decision is hidden behind the [`backend::CartBackend`] strategy trait,
//! selected once at startup by probing authentication.

pub mod backend;
pub mod storage;
pub mod store;

pub use backend::{CartBackend, LocalCartBackend, RemoteCartBackend};
pub use storage::CartFile;
pub use store::CartStore;
