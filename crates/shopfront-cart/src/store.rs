//! The cart store.
//!
//! One instance per application session, injected where it is needed and
//! observed through a `watch` channel. All mutation goes through the store's
//! methods; operations are serialized by an internal lock, so two rapid
//! mutations cannot interleave their refetches.

use shopfront_api::ApiClient;
use shopfront_core::cart::{CartLine, CartMode, CartState, ProductSnapshot};
use shopfront_core::notice::{Notice, NoticeSender};
use shopfront_core::{ShopfrontError, ShopfrontResult};
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::backend::{CartBackend, LocalCartBackend, RemoteCartBackend};
use crate::storage::CartFile;

struct Inner {
    mode: CartMode,
    backend: Box<dyn CartBackend>,
    lines: Vec<CartLine>,
    api: ApiClient,
    cart_file: CartFile,
}

/// Single source of truth for the shopping cart.
pub struct CartStore {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<CartState>,
    notices: NoticeSender,
}

impl CartStore {
    /// Start the store by probing authentication.
    ///
    /// Authenticated sessions get the server-backed cart and an immediate
    /// fetch; anonymous sessions (including a failed probe) get the durable
    /// local cart.
    pub async fn start(api: ApiClient, cart_file: CartFile, notices: NoticeSender) -> Self {
        let store = match api.current_user().await {
            Ok(Some(user)) => {
                info!(user = %user.email, "Authenticated session, using server cart");
                Self::with_backend(
                    CartMode::Remote,
                    Box::new(RemoteCartBackend::new(api.clone())),
                    api,
                    cart_file,
                    notices,
                )
            }
            Ok(None) => {
                info!("Anonymous session, using local cart");
                Self::local(api, cart_file, notices)
            }
            Err(e) => {
                warn!(error = %e, "Auth probe failed, falling back to local cart");
                Self::local(api, cart_file, notices)
            }
        };

        store.refresh().await;
        store
    }

    /// Build a store around an explicit backend. This is the seam tests use
    /// to run without a live backend.
    pub fn with_backend(
        mode: CartMode,
        backend: Box<dyn CartBackend>,
        api: ApiClient,
        cart_file: CartFile,
        notices: NoticeSender,
    ) -> Self {
        let (state_tx, _) = watch::channel(CartState::empty(mode));
        Self {
            inner: Mutex::new(Inner {
                mode,
                backend,
                lines: Vec::new(),
                api,
                cart_file,
            }),
            state_tx,
            notices,
        }
    }

    fn local(api: ApiClient, cart_file: CartFile, notices: NoticeSender) -> Self {
        Self::with_backend(
            CartMode::Local,
            Box::new(LocalCartBackend::load(cart_file.clone())),
            api,
            cart_file,
            notices,
        )
    }

    /// Observe cart state changes.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state_tx.subscribe()
    }

    /// Current cart snapshot.
    pub fn state(&self) -> CartState {
        self.state_tx.borrow().clone()
    }

    /// Add a product to the cart, merging into an existing line for the same
    /// product.
    pub async fn add_to_cart(
        &self,
        product_id: &str,
        quantity: u32,
        product: ProductSnapshot,
    ) -> ShopfrontResult<()> {
        if quantity == 0 {
            return Err(ShopfrontError::validation("Quantity must be at least 1"));
        }

        let mut inner = self.inner.lock().await;
        self.publish(&inner, true);

        let mut result = inner.backend.add(product_id, quantity, &product).await;
        if unauthorized(&result) && inner.mode == CartMode::Remote {
            self.fall_back_to_local(&mut inner);
            result = inner.backend.add(product_id, quantity, &product).await;
        }

        self.apply(&mut inner, result, "Added to cart")
    }

    /// Set a line's quantity. Zero (or anything the UI clamps to zero) means
    /// removal; a quantity below one is never stored.
    pub async fn update_quantity(&self, line_id: &str, quantity: u32) -> ShopfrontResult<()> {
        if quantity == 0 {
            return self.remove_from_cart(line_id).await;
        }

        let mut inner = self.inner.lock().await;
        self.publish(&inner, true);

        let mut result = inner.backend.update(line_id, quantity).await;
        if unauthorized(&result) && inner.mode == CartMode::Remote {
            self.fall_back_to_local(&mut inner);
            result = inner.backend.update(line_id, quantity).await;
        }

        self.apply(&mut inner, result, "Cart updated")
    }

    /// Remove a line from the cart.
    pub async fn remove_from_cart(&self, line_id: &str) -> ShopfrontResult<()> {
        let mut inner = self.inner.lock().await;
        self.publish(&inner, true);

        let mut result = inner.backend.remove(line_id).await;
        if unauthorized(&result) && inner.mode == CartMode::Remote {
            self.fall_back_to_local(&mut inner);
            result = inner.backend.remove(line_id).await;
        }

        self.apply(&mut inner, result, "Removed from cart")
    }

    /// Empty the cart.
    pub async fn clear_cart(&self) -> ShopfrontResult<()> {
        let mut inner = self.inner.lock().await;
        self.publish(&inner, true);

        let mut result = inner.backend.clear().await;
        if unauthorized(&result) && inner.mode == CartMode::Remote {
            self.fall_back_to_local(&mut inner);
            result = inner.backend.clear().await;
        }

        self.apply(&mut inner, result, "Cart cleared")
    }

    /// Replace state with the backend's current cart.
    ///
    /// No-op in local mode, where the in-memory array already is the truth.
    /// A 401 mid-session flips the store to local mode instead of erroring.
    pub async fn fetch_cart(&self) -> ShopfrontResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.mode == CartMode::Local {
            return Ok(());
        }

        self.publish(&inner, true);

        let mut result = inner.backend.fetch().await;
        if unauthorized(&result) {
            self.fall_back_to_local(&mut inner);
            result = inner.backend.fetch().await;
        }

        match result {
            Ok(lines) => {
                inner.lines = lines;
                self.publish(&inner, false);
                Ok(())
            }
            Err(e) => {
                self.publish(&inner, false);
                self.notify(Notice::error("Could not load your cart. Please try again."));
                Err(e)
            }
        }
    }

    /// Merge the anonymous cart into the account cart after login.
    ///
    /// Replays each local line through the add endpoint, discards the durable
    /// file, then switches to the server-backed cart. On any failure the local
    /// cart is kept intact so nothing is lost.
    pub async fn merge_into_account(&self) -> ShopfrontResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.mode == CartMode::Remote {
            return Ok(());
        }

        self.publish(&inner, true);

        for line in &inner.lines {
            if let Err(e) = inner.api.add_cart_line(&line.product_id, line.quantity).await {
                self.publish(&inner, false);
                self.notify(Notice::error(
                    "Could not sync your cart to your account. Please try again.",
                ));
                return Err(e);
            }
        }

        inner.cart_file.delete();
        inner.mode = CartMode::Remote;
        inner.backend = Box::new(RemoteCartBackend::new(inner.api.clone()));

        let result = inner.backend.fetch().await;
        self.apply(&mut inner, result, "Cart synced to your account")
    }

    /// Fetch from the backend regardless of mode, used once at startup.
    async fn refresh(&self) {
        let mut inner = self.inner.lock().await;
        match inner.backend.fetch().await {
            Ok(lines) => {
                inner.lines = lines;
            }
            Err(e) if e.is_unauthorized() => {
                self.fall_back_to_local(&mut inner);
                inner.lines = match inner.backend.fetch().await {
                    Ok(lines) => lines,
                    Err(_) => Vec::new(),
                };
            }
            Err(e) => {
                warn!(error = %e, "Initial cart fetch failed");
                self.notify(Notice::error("Could not load your cart. Please try again."));
            }
        }
        self.publish(&inner, false);
    }

    /// Session expired mid-use: switch to the durable local cart.
    fn fall_back_to_local(&self, inner: &mut MutexGuard<'_, Inner>) {
        warn!("Session expired, switching cart to local mode");
        inner.mode = CartMode::Local;
        inner.backend = Box::new(LocalCartBackend::load(inner.cart_file.clone()));
        self.notify(Notice::warning(
            "Your session expired. The cart is now saved on this device.",
        ));
    }

    fn apply(
        &self,
        inner: &mut MutexGuard<'_, Inner>,
        result: ShopfrontResult<Vec<CartLine>>,
        success: &str,
    ) -> ShopfrontResult<()> {
        match result {
            Ok(lines) => {
                inner.lines = lines;
                self.publish(inner, false);
                self.notify(Notice::success(success));
                Ok(())
            }
            Err(e) => {
                // Prior state stays untouched; only the loading flag resets.
                self.publish(inner, false);
                self.notify(Notice::error(user_message(&e)));
                Err(e)
            }
        }
    }

    fn publish(&self, inner: &Inner, is_loading: bool) {
        self.state_tx.send_replace(CartState {
            lines: inner.lines.clone(),
            mode: inner.mode,
            is_loading,
        });
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

/// User-facing message for a failed cart operation.
fn user_message(err: &ShopfrontError) -> String {
    match err {
        ShopfrontError::Api { message, .. } if !message.is_empty() => message.clone(),
        _ => "Something went wrong with your cart. Please try again.".to_string(),
    }
}

fn unauthorized<T>(result: &ShopfrontResult<T>) -> bool {
    matches!(result, Err(e) if e.is_unauthorized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shopfront_core::notice::create_notice_channel;
    use std::sync::Mutex as StdMutex;

    fn snapshot(unit: i64, discounted: Option<i64>) -> ProductSnapshot {
        ProductSnapshot {
            name: "Widget".into(),
            unit_price: unit,
            discounted_price: discounted,
            image: None,
            stock_available: None,
        }
    }

    fn server_line(line_id: &str, product_id: &str, quantity: u32) -> CartLine {
        CartLine {
            line_id: line_id.into(),
            product_id: product_id.into(),
            quantity,
            product: snapshot(100, None),
        }
    }

    /// Backend standing in for the server: mutations answer with a scripted
    /// authoritative cart, unrelated to what the client might guess.
    struct ScriptedBackend {
        server_cart: StdMutex<Vec<CartLine>>,
    }

    #[async_trait]
    impl CartBackend for ScriptedBackend {
        async fn fetch(&self) -> ShopfrontResult<Vec<CartLine>> {
            Ok(self.server_cart.lock().unwrap().clone())
        }

        async fn add(
            &self,
            _product_id: &str,
            _quantity: u32,
            _product: &ProductSnapshot,
        ) -> ShopfrontResult<Vec<CartLine>> {
            self.fetch().await
        }

        async fn update(&self, _line_id: &str, _quantity: u32) -> ShopfrontResult<Vec<CartLine>> {
            self.fetch().await
        }

        async fn remove(&self, _line_id: &str) -> ShopfrontResult<Vec<CartLine>> {
            self.fetch().await
        }

        async fn clear(&self) -> ShopfrontResult<Vec<CartLine>> {
            Ok(Vec::new())
        }
    }

    /// Backend whose session has expired: every call answers 401.
    struct ExpiredBackend;

    #[async_trait]
    impl CartBackend for ExpiredBackend {
        async fn fetch(&self) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::Unauthorized)
        }

        async fn add(
            &self,
            _product_id: &str,
            _quantity: u32,
            _product: &ProductSnapshot,
        ) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::Unauthorized)
        }

        async fn update(&self, _line_id: &str, _quantity: u32) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::Unauthorized)
        }

        async fn remove(&self, _line_id: &str) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::Unauthorized)
        }

        async fn clear(&self) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::Unauthorized)
        }
    }

    /// Backend that fails with a server error on every call.
    struct FailingBackend;

    #[async_trait]
    impl CartBackend for FailingBackend {
        async fn fetch(&self) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::api(500, "boom"))
        }

        async fn add(
            &self,
            _product_id: &str,
            _quantity: u32,
            _product: &ProductSnapshot,
        ) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::api(500, "boom"))
        }

        async fn update(&self, _line_id: &str, _quantity: u32) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::api(500, "boom"))
        }

        async fn remove(&self, _line_id: &str) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::api(500, "boom"))
        }

        async fn clear(&self) -> ShopfrontResult<Vec<CartLine>> {
            Err(ShopfrontError::api(500, "boom"))
        }
    }

    fn remote_store(backend: Box<dyn CartBackend>, dir: &tempfile::TempDir) -> CartStore {
        CartStore::with_backend(
            CartMode::Remote,
            backend,
            ApiClient::new("http://127.0.0.1:1", None),
            CartFile::new(dir.path().join("cart.json")),
            create_notice_channel(),
        )
    }

    fn local_store(dir: &tempfile::TempDir) -> CartStore {
        let file = CartFile::new(dir.path().join("cart.json"));
        CartStore::with_backend(
            CartMode::Local,
            Box::new(LocalCartBackend::load(file.clone())),
            ApiClient::new("http://127.0.0.1:1", None),
            file,
            create_notice_channel(),
        )
    }

    #[tokio::test]
    async fn test_quantity_floor_removes_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = local_store(&dir);

        store
            .add_to_cart("P1", 2, snapshot(100, None))
            .await
            .expect("add");
        let line_id = store.state().lines[0].line_id.clone();

        store.update_quantity(&line_id, 0).await.expect("update");
        assert!(store.state().is_empty());
    }

    #[tokio::test]
    async fn test_local_merge_and_totals() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = local_store(&dir);

        store
            .add_to_cart("P1", 2, snapshot(100, None))
            .await
            .expect("add");
        store
            .add_to_cart("P2", 1, snapshot(250, Some(200)))
            .await
            .expect("add");

        let state = store.state();
        assert_eq!(state.lines.len(), 2);
        assert_eq!(state.total_items(), 3);
        assert_eq!(state.total_price(), 400);

        store
            .add_to_cart("P1", 1, snapshot(100, None))
            .await
            .expect("add");
        let state = store.state();
        assert_eq!(state.lines.len(), 2);
        assert_eq!(state.total_items(), 4);
    }

    #[tokio::test]
    async fn test_remote_state_is_exactly_server_truth() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Server answers with a stock-clamped quantity the client never asked for.
        let store = remote_store(
            Box::new(ScriptedBackend {
                server_cart: StdMutex::new(vec![server_line("srv-1", "P1", 3)]),
            }),
            &dir,
        );

        store
            .add_to_cart("P1", 99, snapshot(100, None))
            .await
            .expect("add");

        let state = store.state();
        assert_eq!(state.lines, vec![server_line("srv-1", "P1", 3)]);
    }

    #[tokio::test]
    async fn test_failed_remote_call_leaves_state_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = remote_store(Box::new(FailingBackend), &dir);

        let before = store.state();
        let result = store.add_to_cart("P1", 1, snapshot(100, None)).await;
        assert!(result.is_err());

        let after = store.state();
        assert_eq!(after.lines, before.lines);
        assert!(!after.is_loading);
    }

    #[tokio::test]
    async fn test_401_flips_to_local_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = remote_store(Box::new(ExpiredBackend), &dir);

        store.fetch_cart().await.expect("fetch tolerates 401");
        assert_eq!(store.state().mode, CartMode::Local);

        // Subsequent adds write to durable storage instead of the backend.
        store
            .add_to_cart("P1", 2, snapshot(100, None))
            .await
            .expect("add");
        assert!(dir.path().join("cart.json").exists());

        let persisted = CartFile::new(dir.path().join("cart.json")).load();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].product_id, "P1");
    }

    #[tokio::test]
    async fn test_zero_quantity_add_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = local_store(&dir);

        let result = store.add_to_cart("P1", 0, snapshot(100, None)).await;
        assert!(result.is_err());
        assert!(store.state().is_empty());
    }

    #[tokio::test]
    async fn test_merge_in_remote_mode_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = remote_store(
            Box::new(ScriptedBackend {
                server_cart: StdMutex::new(vec![server_line("srv-1", "P1", 1)]),
            }),
            &dir,
        );

        store.merge_into_account().await.expect("noop merge");
        assert_eq!(store.state().mode, CartMode::Remote);
    }

    #[tokio::test]
    async fn test_failed_merge_keeps_local_cart_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The store points at an unreachable backend, so replaying the first
        // line fails before anything is discarded.
        let store = local_store(&dir);

        store
            .add_to_cart("P1", 2, snapshot(100, None))
            .await
            .expect("add");
        assert!(dir.path().join("cart.json").exists());

        let result = store.merge_into_account().await;
        assert!(result.is_err());

        let state = store.state();
        assert_eq!(state.mode, CartMode::Local);
        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.lines[0].product_id, "P1");
        assert!(!state.is_loading);

        // The durable file survives, so nothing is lost across a restart.
        let persisted = CartFile::new(dir.path().join("cart.json")).load();
        assert_eq!(persisted.len(), 1);
    }
}
