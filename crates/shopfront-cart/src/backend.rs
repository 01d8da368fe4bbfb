//! Cart storage backends.
//!
//! The store picks one backend at startup: [`RemoteCartBackend`] when the
//! session is authenticated, [`LocalCartBackend`] otherwise. Every operation
//! returns the authoritative line array after the mutation, so the store never
//! guesses at merged results.

use async_trait::async_trait;
use shopfront_api::ApiClient;
use shopfront_core::cart::{CartLine, ProductSnapshot};
use shopfront_core::ShopfrontResult;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::storage::CartFile;

/// Common contract for the two cart storage strategies.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Current authoritative line array.
    async fn fetch(&self) -> ShopfrontResult<Vec<CartLine>>;

    /// Create or increment the line for a product.
    async fn add(
        &self,
        product_id: &str,
        quantity: u32,
        product: &ProductSnapshot,
    ) -> ShopfrontResult<Vec<CartLine>>;

    /// Set the quantity of an existing line. Callers enforce the quantity
    /// floor; a quantity of zero never reaches the backend.
    async fn update(&self, line_id: &str, quantity: u32) -> ShopfrontResult<Vec<CartLine>>;

    /// Remove a line.
    async fn remove(&self, line_id: &str) -> ShopfrontResult<Vec<CartLine>>;

    /// Remove every line.
    async fn clear(&self) -> ShopfrontResult<Vec<CartLine>>;
}

/// Server-backed cart: the backend owns quantity-merge and stock-clamp logic,
/// so every mutation is followed by a full refetch.
pub struct RemoteCartBackend {
    api: ApiClient,
}

impl RemoteCartBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CartBackend for RemoteCartBackend {
    async fn fetch(&self) -> ShopfrontResult<Vec<CartLine>> {
        self.api.fetch_cart().await
    }

    async fn add(
        &self,
        product_id: &str,
        quantity: u32,
        _product: &ProductSnapshot,
    ) -> ShopfrontResult<Vec<CartLine>> {
        self.api.add_cart_line(product_id, quantity).await?;
        self.api.fetch_cart().await
    }

    async fn update(&self, line_id: &str, quantity: u32) -> ShopfrontResult<Vec<CartLine>> {
        self.api.update_cart_line(line_id, quantity).await?;
        self.api.fetch_cart().await
    }

    async fn remove(&self, line_id: &str) -> ShopfrontResult<Vec<CartLine>> {
        self.api.remove_cart_line(line_id).await?;
        self.api.fetch_cart().await
    }

    async fn clear(&self) -> ShopfrontResult<Vec<CartLine>> {
        self.api.clear_cart().await?;
        Ok(Vec::new())
    }
}

/// Anonymous cart: the in-memory array is the truth, written through to the
/// durable file after every successful mutation.
pub struct LocalCartBackend {
    file: CartFile,
    lines: Mutex<Vec<CartLine>>,
}

impl LocalCartBackend {
    /// Load the persisted cart (empty on missing or corrupt file).
    pub fn load(file: CartFile) -> Self {
        let lines = file.load();
        Self {
            file,
            lines: Mutex::new(lines),
        }
    }
}

#[async_trait]
impl CartBackend for LocalCartBackend {
    async fn fetch(&self) -> ShopfrontResult<Vec<CartLine>> {
        Ok(self.lines.lock().await.clone())
    }

    async fn add(
        &self,
        product_id: &str,
        quantity: u32,
        product: &ProductSnapshot,
    ) -> ShopfrontResult<Vec<CartLine>> {
        let mut lines = self.lines.lock().await;

        if let Some(existing) = lines.iter_mut().find(|l| l.product_id == product_id) {
            // Same product merges into the existing line, keeping its id.
            existing.quantity += quantity;
        } else {
            lines.push(CartLine {
                line_id: Uuid::new_v4().to_string(),
                product_id: product_id.to_string(),
                quantity,
                product: product.clone(),
            });
        }

        self.file.save(&lines)?;
        Ok(lines.clone())
    }

    async fn update(&self, line_id: &str, quantity: u32) -> ShopfrontResult<Vec<CartLine>> {
        let mut lines = self.lines.lock().await;

        if let Some(line) = lines.iter_mut().find(|l| l.line_id == line_id) {
            line.quantity = quantity;
        }

        self.file.save(&lines)?;
        Ok(lines.clone())
    }

    async fn remove(&self, line_id: &str) -> ShopfrontResult<Vec<CartLine>> {
        let mut lines = self.lines.lock().await;
        lines.retain(|l| l.line_id != line_id);
        self.file.save(&lines)?;
        Ok(lines.clone())
    }

    async fn clear(&self) -> ShopfrontResult<Vec<CartLine>> {
        let mut lines = self.lines.lock().await;
        lines.clear();
        self.file.delete();
        Ok(Vec::new())
    }
}
