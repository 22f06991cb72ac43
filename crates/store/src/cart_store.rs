//! The cart store: single source of truth for cart contents.
//!
//! # Lifecycle
//!
//! 1. [`CartStore::open`] reads the persisted cart once (hydration) and
//!    spawns the persistence worker.
//! 2. Each mutation applies a pure transition, commits the resulting state
//!    by replacing the shared snapshot, and queues that same snapshot for
//!    persistence. The caller sees the new state immediately; the write
//!    lands later.
//! 3. When the last handle is dropped the worker finishes the queued writes
//!    and exits. Call [`CartStore::flush`] first to wait for them.
//!
//! # Ordering
//!
//! Commit and enqueue happen under the same lock (the `watch` channel's),
//! so the order of persistence jobs always matches the order of commits and
//! every job carries the snapshot its own mutation produced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pocket_cart_core::{CartCommand, CartState, ItemId, NewItem, Outcome, Totals};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::codec;
use crate::config::CartConfig;
use crate::error::{CartError, Result};
use crate::persistence::{JobSender, PersistJob, spawn_writer};
use crate::storage::KeyValueStore;

/// Shared handle to the cart.
///
/// Cheap to clone; every clone sees and mutates the same cart. Readers get
/// immutable snapshots, and the only way to change the cart is through
/// [`add_to_cart`](Self::add_to_cart), [`increment`](Self::increment) and
/// [`decrement`](Self::decrement).
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: watch::Sender<Arc<CartState>>,
    writer: JobSender,
    revision: AtomicU64,
    storage_key: String,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("storage_key", &self.inner.storage_key)
            .field("revision", &self.inner.revision.load(Ordering::Relaxed))
            .field("items", &self.inner.state.borrow().len())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Open the store, hydrating it from `storage`.
    ///
    /// Must be called from within a Tokio runtime: the persistence worker
    /// is spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Storage`] if the persisted cart cannot be read
    /// and [`CartError::Hydration`] if it was read but is not a valid cart.
    #[instrument(skip_all, fields(key = %config.storage_key))]
    pub async fn open(storage: Arc<dyn KeyValueStore>, config: &CartConfig) -> Result<Self> {
        let initial = hydrate(storage.as_ref(), &config.storage_key).await?;
        let writer = spawn_writer(storage, config.storage_key.clone());
        let (state, _) = watch::channel(Arc::new(initial));

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                state,
                writer,
                revision: AtomicU64::new(0),
                storage_key: config.storage_key.clone(),
            }),
        })
    }

    /// Add a product, or bump its quantity if it is already in the cart.
    ///
    /// When the id is already present only the quantity changes; title,
    /// image and price keep their stored values.
    #[instrument(skip_all, fields(item_id = %item.id))]
    pub fn add_to_cart(&self, item: NewItem) -> Outcome {
        self.dispatch(CartCommand::AddOrIncrement(item))
    }

    /// Bump the quantity of an item. Unknown ids are ignored.
    #[instrument(skip(self), fields(item_id = %id))]
    pub fn increment(&self, id: &ItemId) -> Outcome {
        self.dispatch(CartCommand::Increment(id.clone()))
    }

    /// Lower the quantity of an item, removing it when it reaches zero.
    /// Unknown ids are ignored.
    #[instrument(skip(self), fields(item_id = %id))]
    pub fn decrement(&self, id: &ItemId) -> Outcome {
        self.dispatch(CartCommand::Decrement(id.clone()))
    }

    /// The current cart contents.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CartState> {
        Arc::clone(&*self.inner.state.borrow())
    }

    /// Totals over the current contents, recomputed on every call.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.inner.state.borrow().totals()
    }

    /// Number of committed mutations since the store was opened.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    /// Storage key the cart is persisted under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    /// Watch the cart for changes.
    #[must_use]
    pub fn subscribe(&self) -> CartWatcher {
        CartWatcher {
            rx: self.inner.state.subscribe(),
        }
    }

    /// Wait until every write queued before this call has been attempted.
    ///
    /// Mutations never wait for persistence; call this before shutting
    /// down if the latest state must be on disk.
    pub async fn flush(&self) {
        let (reply, done) = oneshot::channel();
        if self.inner.writer.send(PersistJob::Flush(reply)).is_err() {
            warn!("Cart writer is not running; nothing to flush");
            return;
        }
        if done.await.is_err() {
            warn!("Cart writer stopped before flush completed");
        }
    }

    fn dispatch(&self, command: CartCommand) -> Outcome {
        let mut outcome = Outcome::Unchanged;

        self.inner.state.send_if_modified(|current| {
            let transition = current.apply(command);
            outcome = transition.outcome;
            if !outcome.is_change() {
                return false;
            }

            let snapshot = Arc::new(transition.state);
            *current = Arc::clone(&snapshot);

            let revision = self.inner.revision.fetch_add(1, Ordering::AcqRel) + 1;
            if self
                .inner
                .writer
                .send(PersistJob::Write { revision, snapshot })
                .is_err()
            {
                sentry::capture_message(
                    "Cart writer is not running; mutation will not be persisted",
                    sentry::Level::Error,
                );
                error!(revision, "Cart writer is not running; mutation will not be persisted");
            }
            true
        });

        debug!(?outcome, "Applied cart command");
        outcome
    }
}

/// Read the persisted cart, if any.
async fn hydrate(storage: &dyn KeyValueStore, key: &str) -> Result<CartState> {
    let Some(payload) = storage.get(key).await? else {
        info!("No persisted cart, starting empty");
        return Ok(CartState::empty());
    };

    let state = codec::decode(&payload).map_err(|source| CartError::Hydration {
        key: key.to_string(),
        source,
    })?;

    info!(
        items = state.len(),
        quantity = state.total_item_count(),
        "Hydrated cart from storage"
    );
    Ok(state)
}

/// Receives every state the store commits.
#[derive(Debug, Clone)]
pub struct CartWatcher {
    rx: watch::Receiver<Arc<CartState>>,
}

impl CartWatcher {
    /// Wait for the next commit and return the new state.
    ///
    /// Returns `None` once every [`CartStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<CartState>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&*self.rx.borrow_and_update()))
    }

    /// The most recently committed state.
    #[must_use]
    pub fn current(&self) -> Arc<CartState> {
        Arc::clone(&*self.rx.borrow())
    }

    /// Totals over the most recently committed state.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.rx.borrow().totals()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    fn item(id: &str, price: i64) -> NewItem {
        NewItem::new(id, format!("Item {id}"), format!("https://img/{id}"), Decimal::from(price))
    }

    async fn open_memory() -> (CartStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let store = CartStore::open(storage.clone(), &CartConfig::default())
            .await
            .unwrap();
        (store, storage)
    }

    async fn persisted(storage: &MemoryStore) -> Option<CartState> {
        storage
            .get("cart:products")
            .await
            .unwrap()
            .map(|payload| codec::decode(&payload).unwrap())
    }

    /// Counts writes and optionally fails them.
    #[derive(Default)]
    struct ProbeStore {
        inner: MemoryStore,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    #[async_trait]
    impl KeyValueStore for ProbeStore {
        async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> std::result::Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StorageError::Unavailable("disk on fire".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_open_empty_storage() {
        let (store, _) = open_memory().await;
        assert!(store.snapshot().is_empty());
        assert_eq!(store.totals(), Totals::default());
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_hydrates_persisted_cart() {
        let storage = Arc::new(MemoryStore::with_value(
            "cart:products",
            r#"[{"id":"B","title":"Bag","imageUrl":"u","price":5,"quantity":2}]"#,
        ));
        let store = CartStore::open(storage, &CartConfig::default())
            .await
            .unwrap();

        let totals = store.totals();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.price, Decimal::from(10));
    }

    #[tokio::test]
    async fn test_hydration_failure_is_surfaced() {
        let storage = Arc::new(MemoryStore::with_value("cart:products", "{broken"));
        let err = CartStore::open(storage, &CartConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Hydration { ref key, .. } if key == "cart:products"));
    }

    #[tokio::test]
    async fn test_mutations_visible_before_write_lands() {
        let (store, _) = open_memory().await;

        assert_eq!(store.add_to_cart(item("A", 10)), Outcome::Added);
        // No await between the mutation and the read.
        assert_eq!(store.snapshot().items()[0].quantity, 1);
        assert_eq!(store.totals().price, Decimal::from(10));
    }

    #[tokio::test]
    async fn test_persists_post_mutation_snapshot() {
        let (store, storage) = open_memory().await;

        store.add_to_cart(item("A", 10));
        store.flush().await;
        assert_eq!(persisted(&storage).await.unwrap(), *store.snapshot());

        store.increment(&ItemId::new("A"));
        store.flush().await;
        assert_eq!(persisted(&storage).await.unwrap().items()[0].quantity, 2);

        store.decrement(&ItemId::new("A"));
        store.decrement(&ItemId::new("A"));
        store.flush().await;
        assert!(persisted(&storage).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_outcome_skips_write() {
        let storage = Arc::new(ProbeStore::default());
        let store = CartStore::open(storage.clone(), &CartConfig::default())
            .await
            .unwrap();

        assert_eq!(store.increment(&ItemId::new("ghost")), Outcome::Unchanged);
        assert_eq!(store.decrement(&ItemId::new("ghost")), Outcome::Unchanged);
        store.flush().await;

        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_cart_usable() {
        let storage = Arc::new(ProbeStore {
            fail_writes: true,
            ..ProbeStore::default()
        });
        let store = CartStore::open(storage.clone(), &CartConfig::default())
            .await
            .unwrap();

        store.add_to_cart(item("A", 4));
        store.flush().await;
        store.add_to_cart(item("A", 4));
        store.flush().await;

        assert!(storage.writes.load(Ordering::SeqCst) >= 1);
        assert_eq!(store.snapshot().items()[0].quantity, 2);
        assert_eq!(store.totals().price, Decimal::from(8));
    }

    #[tokio::test]
    async fn test_totals_saturate_on_huge_prices() {
        let (store, _) = open_memory().await;
        let mut watcher = store.subscribe();

        store.add_to_cart(NewItem::new("max", "Max", "u", Decimal::MAX));
        store.add_to_cart(NewItem::new("max", "Max", "u", Decimal::MAX));
        watcher.changed().await.unwrap();

        assert_eq!(store.totals().item_count, 2);
        assert_eq!(store.totals().price, Decimal::MAX);
        assert_eq!(watcher.totals().price, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_watcher_sees_each_commit() {
        let (store, _) = open_memory().await;
        let mut watcher = store.subscribe();

        store.add_to_cart(item("A", 3));
        let state = watcher.changed().await.unwrap();
        assert_eq!(state.total_item_count(), 1);

        store.add_to_cart(item("A", 3));
        watcher.changed().await.unwrap();
        assert_eq!(watcher.totals().price, Decimal::from(6));
    }

    #[tokio::test]
    async fn test_watcher_ends_when_store_dropped() {
        let (store, _) = open_memory().await;
        let mut watcher = store.subscribe();
        drop(store);
        assert!(watcher.changed().await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (store, _) = open_memory().await;
        let other = store.clone();

        store.add_to_cart(item("A", 1));
        other.increment(&ItemId::new("A"));

        assert_eq!(store.snapshot().items()[0].quantity, 2);
        assert_eq!(store.revision(), 2);
    }
}
