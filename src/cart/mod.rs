// Cart Synchronization State
// Client-side mirror of the server cart, kept coherent by read-after-write refresh

pub mod model;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::session::SessionHandle;
use crate::transport::Transport;
pub use model::{CartItem, CartSummary, CheckoutReceipt, MutationResult};
use model::CartLine;

const CART_PATH: &str = "/api/cart";
const SUMMARY_PATH: &str = "/api/cart/summary";
const ADD_PATH: &str = "/api/cart/add";
const UPDATE_PATH: &str = "/api/cart/update";
const REMOVE_PATH: &str = "/api/cart/remove";
const CLEAR_PATH: &str = "/api/cart/clear";
const CHECKOUT_PATH: &str = "/api/cart/checkout";

/// Last server snapshot of the cart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: u64) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }
}

/// What a pending operation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingKey {
    /// A single product line
    Item(u64),
    /// Whole-cart operations (clear, checkout)
    Cart,
}

/// Cart state bound to a session
pub struct CartSync {
    transport: Arc<Transport>,

    session: SessionHandle,

    /// Replaced wholesale on every successful fetch
    state: ArcSwap<CartSnapshot>,

    /// In-flight mutations per key
    pending: DashMap<PendingKey, usize>,

    /// In-flight item list fetches
    loading: AtomicUsize,
}

impl CartSync {
    pub fn new(transport: Arc<Transport>) -> Self {
        let session = transport.session().clone();

        Self {
            transport,
            session,
            state: ArcSwap::from_pointee(CartSnapshot::default()),
            pending: DashMap::new(),
            loading: AtomicUsize::new(0),
        }
    }

    /// Current snapshot (wait-free read)
    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        self.state.load_full()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.state.load().items.clone()
    }

    pub fn summary(&self) -> CartSummary {
        self.state.load().summary
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire) > 0
    }

    /// Whether a mutation for `key` is currently in flight
    pub fn is_pending(&self, key: PendingKey) -> bool {
        self.pending.contains_key(&key)
    }

    /// Replace the item list with the server's, then refresh the summary.
    ///
    /// Anonymous sessions clear locally without a request. On failure the
    /// list is emptied rather than left stale, and the error is returned.
    pub async fn fetch_items(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            self.clear_local();
            return Ok(());
        }

        let _loading = LoadingGuard::enter(&self.loading);

        match self.transport.get::<Vec<CartItem>>(CART_PATH).await {
            Ok(items) => {
                debug!(count = items.len(), "Cart items fetched");
                self.apply(|snapshot| snapshot.items = items.clone());
                // Summary failures are logged inside and keep the prior value
                let _ = self.fetch_summary().await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart items");
                self.state.rcu(|current| CartSnapshot {
                    items: Vec::new(),
                    summary: current.summary,
                });
                Err(e)
            }
        }
    }

    /// Replace the summary. No-op when anonymous; on failure the prior
    /// value is kept.
    pub async fn fetch_summary(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            return Ok(());
        }

        match self.transport.get::<CartSummary>(SUMMARY_PATH).await {
            Ok(summary) => {
                self.apply(|snapshot| snapshot.summary = summary);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart summary");
                Err(e)
            }
        }
    }

    pub async fn add_to_cart(&self, product_id: u64, quantity: u32) -> Result<MutationResult> {
        self.ensure_authenticated()?;
        ensure_quantity(quantity)?;

        let line = CartLine { product_id, quantity };
        self.mutate(PendingKey::Item(product_id), "add", self.transport.post(ADD_PATH, &line))
            .await
    }

    /// Set the quantity of a line. Only `quantity >= 1` is enforced here;
    /// stock limits are left to the server.
    pub async fn update_cart_item(&self, product_id: u64, quantity: u32) -> Result<MutationResult> {
        self.ensure_authenticated()?;
        ensure_quantity(quantity)?;

        let line = CartLine { product_id, quantity };
        self.mutate(PendingKey::Item(product_id), "update", self.transport.put(UPDATE_PATH, &line))
            .await
    }

    pub async fn remove_from_cart(&self, product_id: u64) -> Result<MutationResult> {
        self.ensure_authenticated()?;

        let path = format!("{}/{}", REMOVE_PATH, product_id);
        self.mutate(PendingKey::Item(product_id), "remove", self.transport.delete(&path))
            .await
    }

    pub async fn clear_cart(&self) -> Result<MutationResult> {
        self.ensure_authenticated()?;

        self.mutate(PendingKey::Cart, "clear", self.transport.delete(CLEAR_PATH))
            .await
    }

    /// Settle the cart against the account balance.
    /// Callers are expected to skip this for an empty cart.
    pub async fn checkout(&self) -> Result<CheckoutReceipt> {
        self.ensure_authenticated()?;

        let receipt: CheckoutReceipt = self
            .mutate(PendingKey::Cart, "checkout", self.transport.post_empty(CHECKOUT_PATH))
            .await?;

        self.session.update_balance(receipt.remaining_balance);
        info!(
            total_amount = receipt.total_amount,
            remaining_balance = receipt.remaining_balance,
            "🧾 Checkout settled"
        );
        Ok(receipt)
    }

    /// React to a session flip: anonymous clears locally, authenticated
    /// performs one full fetch.
    pub async fn on_session_change(&self, authenticated: bool) {
        if authenticated {
            if let Err(e) = self.fetch_items().await {
                debug!(error = %e, "Initial cart fetch after login failed");
            }
        } else {
            self.clear_local();
            debug!("Cart cleared for anonymous session");
        }
    }

    /// Follow the session for as long as it exists
    pub fn spawn_session_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let cart = Arc::clone(self);
        let mut rx = self.session.subscribe();

        tokio::spawn(async move {
            let mut authenticated = rx.borrow_and_update().is_authenticated;
            if authenticated {
                cart.on_session_change(true).await;
            }

            while rx.changed().await.is_ok() {
                let now = rx.borrow_and_update().is_authenticated;
                if now != authenticated {
                    authenticated = now;
                    cart.on_session_change(now).await;
                }
            }
        })
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(StoreError::NotAuthenticated)
        }
    }

    /// Run one mutation request and, on success, refresh from the server.
    /// Refresh failures do not fail the mutation itself.
    async fn mutate<T, F>(&self, key: PendingKey, op: &'static str, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _pending = PendingGuard::enter(&self.pending, key);

        match request.await {
            Ok(value) => {
                debug!(op, ?key, "Cart mutation accepted");
                if let Err(e) = self.fetch_items().await {
                    warn!(op, error = %e, "Refresh after cart mutation failed");
                }
                Ok(value)
            }
            Err(e) => {
                warn!(op, ?key, error = %e, "Cart mutation failed");
                Err(e)
            }
        }
    }

    /// Apply a server result unless the session has ended meanwhile
    fn apply<F>(&self, update: F)
    where
        F: Fn(&mut CartSnapshot),
    {
        // Checked inside the swap so a concurrent clear forces a re-check
        self.state.rcu(|current| {
            if !self.session.is_authenticated() {
                debug!("Dropping cart data that arrived after the session ended");
                return Arc::clone(current);
            }
            let mut next = CartSnapshot::clone(current);
            update(&mut next);
            Arc::new(next)
        });
    }

    fn clear_local(&self) {
        self.state.store(Arc::new(CartSnapshot::default()));
    }
}

fn ensure_quantity(quantity: u32) -> Result<()> {
    if quantity >= 1 {
        Ok(())
    } else {
        Err(StoreError::InvalidQuantity(quantity))
    }
}

struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct PendingGuard<'a> {
    pending: &'a DashMap<PendingKey, usize>,
    key: PendingKey,
}

impl<'a> PendingGuard<'a> {
    fn enter(pending: &'a DashMap<PendingKey, usize>, key: PendingKey) -> Self {
        *pending.entry(key).or_insert(0) += 1;
        Self { pending, key }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove_if_mut(&self.key, |_, count| {
            *count -= 1;
            *count == 0
        });
    }
}
