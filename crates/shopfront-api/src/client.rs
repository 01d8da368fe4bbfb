//! REST client for the storefront backend.

use std::time::Duration;

use serde::Deserialize;
use shopfront_core::auth::UserProfile;
use shopfront_core::cart::CartLine;
use shopfront_core::support::{ContactMessage, SupportRequest};
use shopfront_core::{ShopfrontError, ShopfrontResult};
use tracing::debug;

/// Request timeout for all backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body shape returned by the backend on failures.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Typed client for the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Probe the current session.
    ///
    /// Returns `None` when the backend answers 401, which is the normal
    /// anonymous case, not an error.
    pub async fn current_user(&self) -> ShopfrontResult<Option<UserProfile>> {
        let response = self
            .request(reqwest::Method::GET, "/api/auth/user")
            .send()
            .await
            .map_err(http_err)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("Auth probe returned 401, treating session as anonymous");
            return Ok(None);
        }

        let response = check(response).await?;
        let user = response.json::<UserProfile>().await.map_err(http_err)?;
        Ok(Some(user))
    }

    /// Fetch the full server cart.
    pub async fn fetch_cart(&self) -> ShopfrontResult<Vec<CartLine>> {
        let response = self
            .request(reqwest::Method::GET, "/api/cart")
            .send()
            .await
            .map_err(http_err)?;
        let response = check(response).await?;
        response.json::<Vec<CartLine>>().await.map_err(http_err)
    }

    /// Create or increment a cart line for a product. The backend owns
    /// quantity-merge and stock-clamp logic; callers must refetch afterwards.
    pub async fn add_cart_line(&self, product_id: &str, quantity: u32) -> ShopfrontResult<()> {
        let response = self
            .request(reqwest::Method::POST, "/api/cart")
            .json(&serde_json::json!({
                "productId": product_id,
                "quantity": quantity,
            }))
            .send()
            .await
            .map_err(http_err)?;
        check(response).await?;
        Ok(())
    }

    /// Set the quantity of an existing cart line.
    pub async fn update_cart_line(&self, line_id: &str, quantity: u32) -> ShopfrontResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/api/cart/{line_id}"))
            .json(&serde_json::json!({ "quantity": quantity }))
            .send()
            .await
            .map_err(http_err)?;
        check(response).await?;
        Ok(())
    }

    /// Remove a cart line.
    pub async fn remove_cart_line(&self, line_id: &str) -> ShopfrontResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/cart/{line_id}"))
            .send()
            .await
            .map_err(http_err)?;
        check(response).await?;
        Ok(())
    }

    /// Remove every line from the server cart.
    pub async fn clear_cart(&self) -> ShopfrontResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, "/api/cart")
            .send()
            .await
            .map_err(http_err)?;
        check(response).await?;
        Ok(())
    }

    /// List support requests for the badge poller.
    pub async fn list_support_requests(&self) -> ShopfrontResult<Vec<SupportRequest>> {
        let response = self
            .request(reqwest::Method::GET, "/api/support-requests")
            .send()
            .await
            .map_err(http_err)?;
        let response = check(response).await?;
        response
            .json::<Vec<SupportRequest>>()
            .await
            .map_err(http_err)
    }

    /// List contact messages for the badge poller.
    pub async fn list_contact_messages(&self) -> ShopfrontResult<Vec<ContactMessage>> {
        let response = self
            .request(reqwest::Method::GET, "/api/messages")
            .send()
            .await
            .map_err(http_err)?;
        let response = check(response).await?;
        response
            .json::<Vec<ContactMessage>>()
            .await
            .map_err(http_err)
    }
}

/// Map a transport-level reqwest error into the shared error type.
fn http_err(err: reqwest::Error) -> ShopfrontError {
    ShopfrontError::Http(err.to_string())
}

/// Convert non-success responses into typed errors, preferring the server's
/// own error message when the body carries one.
async fn check(response: reqwest::Response) -> ShopfrontResult<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(ShopfrontError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        return Err(ShopfrontError::api(status.as_u16(), message));
    }
    Ok(response)
}
