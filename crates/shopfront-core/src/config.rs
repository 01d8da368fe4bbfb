//! Runtime configuration.

use std::path::PathBuf;

/// Default backend base URL.
const DEFAULT_API_URL: &str = "http://127.0.0.1:4000";

/// Default WebSocket endpoint for the admin channel.
const DEFAULT_WS_URL: &str = "ws://127.0.0.1:4000/ws";

/// Configuration for the storefront client, read from the environment.
#[derive(Debug, Clone)]
pub struct ShopfrontConfig {
    /// Backend REST base URL (`SHOPFRONT_API_URL`).
    pub api_url: String,
    /// Admin WebSocket endpoint (`SHOPFRONT_WS_URL`).
    pub ws_url: String,
    /// Bearer token attached to API requests when present (`SHOPFRONT_API_TOKEN`).
    pub api_token: Option<String>,
    /// Durable file holding the anonymous cart (`SHOPFRONT_CART_FILE`).
    pub cart_file: PathBuf,
}

impl ShopfrontConfig {
    /// Read configuration from environment variables, with defaults.
    pub fn from_env() -> Self {
        let api_url = std::env::var("SHOPFRONT_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let ws_url =
            std::env::var("SHOPFRONT_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        let api_token = std::env::var("SHOPFRONT_API_TOKEN").ok();
        let cart_file = std::env::var("SHOPFRONT_CART_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_cart_file());

        Self {
            api_url,
            ws_url,
            api_token,
            cart_file,
        }
    }

    /// Default configuration pointing at localhost, with the cart file under
    /// the user's home directory.
    pub fn default_local() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            api_token: None,
            cart_file: default_cart_file(),
        }
    }
}

fn default_cart_file() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".shopfront")
        .join("cart.json")
}
