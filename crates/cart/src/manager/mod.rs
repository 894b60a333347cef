//! Cart synchronization manager.
//!
//! [`CartManager`] owns the UI-facing view of the cart and keeps it
//! consistent with exactly one backing store at a time:
//!
//! - **Guest**: the cart lives in local key-value storage under the guest
//!   cart key. Every mutation rewrites the whole blob.
//! - **Authenticated**: the server cart is authoritative. Mutations go
//!   through the cart endpoints; adds resync from the server.
//!
//! Quantity changes are shown immediately through an overlay and persisted
//! after a per-item debounce window, so a burst of taps on a stepper turns
//! into a single write of the last value.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = CartManager::start(config, http, storage, AuthStatus::Guest).await;
//!
//! manager.add_item(item_id.clone(), 2, Some(details)).await;
//! manager.update_quantity(&item_id, 3);
//!
//! // After login:
//! let transition = manager
//!     .on_auth_state_changed(AuthStatus::Guest, AuthStatus::Authenticated)
//!     .await;
//! ```

mod debounce;
mod migration;
mod outcome;
pub(crate) mod state;

pub use migration::{MigrationFailure, MigrationReport};
pub use outcome::{AuthTransition, MutationOutcome, Rollback};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use medicart_core::{CartLineItem, CurrencyCode, ItemId, Price};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::auth::AuthStatus;
use crate::config::{CartConfig, GuestCartRetention};
use crate::error::CartError;
use crate::http::{CartApi, HttpRequester};
use crate::storage::KeyValueStore;

use debounce::PendingWrites;
use state::{CartState, normalize_lines};

/// Shared handle to the cart.
///
/// Construct once at app start and pass clones to whoever needs the cart.
/// Pending debounce tasks are aborted when the last clone is dropped.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<CartManagerInner>,
}

struct CartManagerInner {
    config: CartConfig,
    api: CartApi,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<CartState>,
    pending: Mutex<PendingWrites>,
    /// Held across every guest cart write, by debounce tasks from before they
    /// detach until their write lands, and by a migration while it reads and
    /// retires the guest cart.
    persist: tokio::sync::Mutex<()>,
    loading: AtomicUsize,
    syncing: AtomicBool,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("auth", &self.auth_status())
            .field("lines", &self.state().items.len())
            .field("pending_updates", &self.pending_updates())
            .finish_non_exhaustive()
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

struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CartManager {
    /// Create a manager without loading anything.
    #[must_use]
    pub fn new(
        config: CartConfig,
        http: Arc<dyn HttpRequester>,
        storage: Arc<dyn KeyValueStore>,
        auth: AuthStatus,
    ) -> Self {
        let api = CartApi::new(http, config.product_type);
        Self {
            inner: Arc::new(CartManagerInner {
                config,
                api,
                storage,
                state: Mutex::new(CartState::new(auth)),
                pending: Mutex::new(PendingWrites::default()),
                persist: tokio::sync::Mutex::new(()),
                loading: AtomicUsize::new(0),
                syncing: AtomicBool::new(false),
            }),
        }
    }

    /// Create a manager and seed it from the active backing store.
    ///
    /// A failed server fetch leaves the cart empty; call [`Self::load`] again
    /// to retry.
    pub async fn start(
        config: CartConfig,
        http: Arc<dyn HttpRequester>,
        storage: Arc<dyn KeyValueStore>,
        auth: AuthStatus,
    ) -> Self {
        let manager = Self::new(config, http, storage, auth);
        if let Err(e) = manager.load().await {
            debug!(error = %e, "Initial cart load failed");
        }
        manager
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, PendingWrites> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn config(&self) -> &CartConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn auth_status(&self) -> AuthStatus {
        self.state().auth
    }

    /// A `load()` is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire) > 0
    }

    /// A guest cart migration is in flight.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    /// Cart lines with pending quantities applied.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.state().displayed_items()
    }

    /// Quantity shown for an item, including a pending change.
    #[must_use]
    pub fn displayed_quantity(&self, item_id: &ItemId) -> Option<u32> {
        self.state().displayed_quantity(item_id)
    }

    /// Sum of price × displayed quantity over all lines.
    #[must_use]
    pub fn item_total(&self) -> Decimal {
        self.state().item_total()
    }

    /// Sum of displayed quantities (badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.state().item_count()
    }

    /// [`Self::item_total`] as a displayable price.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        Price::new(self.item_total(), CurrencyCode::default())
    }

    /// Number of debounced quantity writes not yet fired.
    #[must_use]
    pub fn pending_updates(&self) -> usize {
        self.pending().len()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reload the cart from the active backing store.
    ///
    /// Guest carts that cannot be read or parsed load as empty. Overlay
    /// values for items with a pending write are kept.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the server cart could not be loaded; the
    /// previous in-memory cart is left untouched in that case.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(), CartError> {
        let _loading = LoadingGuard::enter(&self.inner.loading);
        let auth = self.auth_status();

        let items = if auth.is_authenticated() {
            match self.inner.api.fetch_cart().await {
                Ok(cart) => cart.items,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch server cart, keeping current state");
                    return Err(e);
                }
            }
        } else {
            self.read_guest_cart().await
        };

        let keep_overlay = self.pending().item_ids();
        let mut state = self.state();
        if state.auth != auth {
            debug!("Auth status changed during load, discarding result");
            return Ok(());
        }
        state.replace_all(items, &keep_overlay);
        debug!(lines = state.items.len(), "Cart loaded");
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of an item.
    ///
    /// Guests get the line added (or incremented) in memory and the guest
    /// cart rewritten. Authenticated users get a server add followed by a full
    /// resync; nothing changes in memory unless the server accepts it.
    #[instrument(skip(self, item_details), fields(item_id = %item_id))]
    pub async fn add_item(
        &self,
        item_id: ItemId,
        quantity: u32,
        item_details: Option<Value>,
    ) -> MutationOutcome {
        if quantity == 0 {
            return MutationOutcome::Failed {
                error: CartError::InvalidQuantity(quantity),
                rollback_to: None,
            };
        }

        if self.auth_status().is_authenticated() {
            if let Err(error) = self.inner.api.add_item(&item_id, quantity).await {
                warn!(error = %error, "Server rejected add to cart");
                return MutationOutcome::Failed {
                    error,
                    rollback_to: None,
                };
            }
            if self.load().await.is_err() {
                debug!("Resync after add failed, cart may be stale");
            }
            return MutationOutcome::Applied;
        }

        self.state()
            .add_or_increment(item_id, quantity, item_details);
        self.save_guest_cart().await;
        MutationOutcome::Applied
    }

    /// Show `new_quantity` immediately and persist it once the debounce
    /// window passes without another change to the same item.
    ///
    /// Must be called from within a Tokio runtime. Items not in the cart are
    /// ignored.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub fn update_quantity(&self, item_id: &ItemId, new_quantity: u32) {
        {
            let mut state = self.state();
            if state.line(item_id).is_none() {
                debug!("Item not in cart, ignoring quantity update");
                return;
            }
            state.overlay.insert(item_id.clone(), new_quantity);
        }
        self.arm_debounce(item_id.clone());
    }

    fn arm_debounce(&self, item_id: ItemId) {
        let delay = self.inner.config.debounce;
        let weak = Arc::downgrade(&self.inner);
        let task_item = item_id.clone();

        // Holding the lock while spawning keeps the task from detaching
        // before it has been armed.
        let mut pending = self.pending();
        let generation = pending.next_generation();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = Self { inner };
            let _persist = manager.inner.persist.lock().await;
            if !manager.pending().detach(&task_item, generation) {
                return;
            }
            manager.persist_quantity(&task_item).await;
        });
        pending.arm(item_id, generation, handle);
    }

    /// Write the overlay quantity for one item to the active store.
    ///
    /// Callers hold the persist lock.
    async fn persist_quantity(&self, item_id: &ItemId) {
        let (quantity, auth, items) = {
            let mut state = self.state();
            let Some(target) = state.overlay.get(item_id).copied() else {
                return;
            };
            let persisted = state.line(item_id).map(|line| line.quantity);
            let Some(persisted) = persisted else {
                state.overlay.remove(item_id);
                return;
            };
            if target == persisted {
                debug!(item_id = %item_id, "Quantity unchanged, skipping write");
                return;
            }
            if target < 1 {
                debug!(item_id = %item_id, "Quantity below 1, skipping write");
                state.overlay.insert(item_id.clone(), persisted);
                return;
            }
            if let Some(line) = state.items.iter_mut().find(|line| &line.item_id == item_id) {
                line.quantity = target;
            }
            (target, state.auth, state.items.clone())
        };

        if auth.is_authenticated() {
            if let Err(e) = self.inner.api.change_quantity(item_id, quantity).await {
                warn!(item_id = %item_id, quantity, error = %e, "Failed to update server cart quantity");
            }
        } else {
            self.store_guest_lines(&items).await;
        }
    }

    /// Remove an item.
    ///
    /// The line disappears from memory (and any pending quantity write is
    /// cancelled) before the backing store is touched. If the server rejects
    /// the removal the outcome carries the removed line for
    /// [`Self::revert`].
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: &ItemId) -> MutationOutcome {
        self.pending().cancel(item_id);
        let (removed, auth) = {
            let mut state = self.state();
            (state.remove(item_id), state.auth)
        };

        let Some(removed) = removed else {
            debug!("Item not in cart, nothing to remove");
            return MutationOutcome::Applied;
        };
        let rollback = Rollback {
            line: removed.line,
            overlay_quantity: removed.overlay,
        };

        if !auth.is_authenticated() {
            self.save_guest_cart().await;
            return MutationOutcome::Applied;
        }

        match self.inner.api.remove_item(item_id).await {
            Ok(_) => MutationOutcome::Applied,
            Err(error) => {
                warn!(error = %error, "Server rejected item removal");
                MutationOutcome::Failed {
                    error,
                    rollback_to: Some(rollback),
                }
            }
        }
    }

    /// Put back a line captured by a failed mutation. In memory only.
    ///
    /// Returns `false` if the item is already back in the cart.
    pub fn revert(&self, rollback: Rollback) -> bool {
        self.state()
            .restore(rollback.line, rollback.overlay_quantity)
    }

    /// Empty the cart.
    ///
    /// Guests also lose the stored guest cart. The server cart is not
    /// touched for authenticated users.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let cancelled = self.pending().cancel_all();
        let auth = {
            let mut state = self.state();
            state.clear();
            state.auth
        };
        if !auth.is_authenticated() {
            let _persist = self.inner.persist.lock().await;
            self.remove_guest_cart().await;
        }
        debug!(cancelled = cancelled.len(), "Cart cleared");
    }

    /// Fire every pending quantity write now instead of waiting for its
    /// debounce window. Returns how many items were flushed.
    ///
    /// A write whose debounce window already elapsed finishes before this
    /// returns.
    pub async fn flush_pending(&self) -> usize {
        let _persist = self.inner.persist.lock().await;
        let items = self.pending().cancel_all();
        for item_id in &items {
            self.persist_quantity(item_id).await;
        }
        items.len()
    }

    /// Drop every pending quantity write without persisting it.
    pub fn shutdown(&self) -> usize {
        self.pending().cancel_all().len()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// React to a login or logout.
    ///
    /// On login, pending guest quantity edits are flushed to the guest cart,
    /// which is then migrated to the server. On logout, pending writes are
    /// dropped, the server cart is abandoned client side, and the guest cart
    /// is loaded.
    #[instrument(skip(self))]
    pub async fn on_auth_state_changed(&self, prev: AuthStatus, next: AuthStatus) -> AuthTransition {
        let current = self.auth_status();
        if current != prev {
            debug!(?current, "Cart auth status differs from reported previous status");
        }
        if current == next {
            return AuthTransition::Unchanged;
        }

        match next {
            AuthStatus::Authenticated => {
                self.flush_pending().await;
                self.state().auth = next;
                AuthTransition::Migrated(self.migrate_guest_cart_to_server().await)
            }
            AuthStatus::Guest => {
                self.pending().cancel_all();
                {
                    let mut state = self.state();
                    state.auth = next;
                    state.clear();
                }
                if let Err(e) = self.load().await {
                    debug!(error = %e, "Guest cart load after logout failed");
                }
                AuthTransition::LoggedOut
            }
        }
    }

    /// Replay the guest cart into the server cart.
    ///
    /// Items are sent in batches of `migration_concurrency`. Failures are
    /// collected, not retried. The guest cart is then deleted (or trimmed to
    /// the failed items, depending on [`GuestCartRetention`]) and the server
    /// cart is reloaded.
    ///
    /// Returns a skipped report if the session is not authenticated or a
    /// migration is already running.
    #[instrument(skip(self))]
    pub async fn migrate_guest_cart_to_server(&self) -> MigrationReport {
        if !self.auth_status().is_authenticated() {
            debug!("Not authenticated, skipping guest cart migration");
            return MigrationReport::skipped();
        }
        if self
            .inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Guest cart migration already in progress");
            return MigrationReport::skipped();
        }
        let _syncing = SyncingGuard(&self.inner.syncing);

        let persist = self.inner.persist.lock().await;
        let guest_items = self.read_guest_cart().await;
        let batch_size = self.inner.config.migration_concurrency.max(1);
        let mut report = MigrationReport::default();

        for batch in guest_items.chunks(batch_size) {
            let results = join_all(
                batch
                    .iter()
                    .map(|line| self.inner.api.add_item(&line.item_id, line.quantity)),
            )
            .await;

            for (line, result) in batch.iter().zip(results) {
                match result {
                    Ok(_) => report.migrated.push(line.item_id.clone()),
                    Err(e) => {
                        warn!(item_id = %line.item_id, error = %e, "Failed to migrate guest cart item");
                        report.failures.push(MigrationFailure {
                            line: line.clone(),
                            error: e.user_message(),
                        });
                    }
                }
            }
        }

        report.guest_cart_cleared = match self.inner.config.guest_cart_retention {
            GuestCartRetention::KeepFailed if !report.failures.is_empty() => {
                self.store_guest_lines(&report.failed_lines()).await;
                false
            }
            GuestCartRetention::DiscardAll | GuestCartRetention::KeepFailed => {
                self.remove_guest_cart().await
            }
        };
        drop(persist);

        if let Err(e) = self.load().await {
            report.resync_error = Some(e.user_message());
        }

        info!(
            migrated = report.migrated.len(),
            failed = report.failures.len(),
            guest_cart_cleared = report.guest_cart_cleared,
            "Guest cart migration finished"
        );
        report
    }

    // =========================================================================
    // Guest storage
    // =========================================================================

    async fn read_guest_cart(&self) -> Vec<CartLineItem> {
        let key = &self.inner.config.guest_cart_key;
        match self.inner.storage.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLineItem>>(&raw) {
                Ok(items) => normalize_lines(items),
                Err(e) => {
                    warn!(error = %e, "Stored guest cart is unreadable, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read guest cart, treating as empty");
                Vec::new()
            }
        }
    }

    /// Write the current overlay as the guest cart.
    async fn save_guest_cart(&self) {
        let _persist = self.inner.persist.lock().await;
        let items = self.state().items.clone();
        self.store_guest_lines(&items).await;
    }

    /// Callers hold the persist lock.
    async fn store_guest_lines(&self, items: &[CartLineItem]) {
        let raw = match serde_json::to_string(items) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to serialize guest cart");
                return;
            }
        };
        if let Err(e) = self
            .inner
            .storage
            .set(&self.inner.config.guest_cart_key, raw)
            .await
        {
            warn!(error = %e, "Failed to persist guest cart");
        }
    }

    async fn remove_guest_cart(&self) -> bool {
        match self
            .inner
            .storage
            .remove(&self.inner.config.guest_cart_key)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to delete guest cart");
                false
            }
        }
    }
}
