//! Selection store
//!
//! Holds the products the user picked, in the order they were picked, unique by
//! id. Every mutation re-renders the summary view and writes the selection
//! through to durable storage before the store lock is released, so the
//! in-memory list, the rendered summary and the stored record move together.

pub mod record;
pub mod storage;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::catalog::{load_catalog, Catalog, CatalogError, CatalogSource, Product, ProductId};
use crate::view::{render_summary, SummaryView};

pub use record::SelectionRecord;
pub use storage::{KeyValueStorage, SqliteStorage, StorageError};

#[cfg(test)]
pub(crate) use storage::testing::InMemoryStorage;

/// Key the browser widget has always stored the selection under
pub const DEFAULT_STORAGE_KEY: &str = "selectedProducts";

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Product {0} is not in the catalog")]
    UnknownProduct(ProductId),

    #[error("Failed to persist selection: {0}")]
    Storage(#[from] StorageError),
}

/// What a toggle ended up doing
#[derive(Debug, Clone, PartialEq)]
pub enum Toggled {
    Added(Product),
    Removed(ProductId),
    /// Another toggle added the same id while this one was resolving it;
    /// this resolution replaced the entry in place
    AlreadySelected(ProductId),
}

/// Outcome of restoring a persisted record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    /// Ids that no longer resolve against the catalog
    pub dropped: Vec<ProductId>,
}

pub struct SelectionStore {
    selected: Mutex<Vec<Product>>,
    catalog: Arc<dyn CatalogSource>,
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    summary: watch::Sender<SummaryView>,
}

impl SelectionStore {
    /// Create an empty store
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        storage: Arc<dyn KeyValueStorage>,
        key: impl Into<String>,
    ) -> Self {
        let (summary, _) = watch::channel(render_summary(&[]));
        Self {
            selected: Mutex::new(Vec::new()),
            catalog,
            storage,
            key: key.into(),
            summary,
        }
    }

    /// Receive a freshly rendered summary after every mutation
    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SummaryView> {
        self.summary.subscribe()
    }

    /// The most recently rendered summary
    pub fn summary(&self) -> SummaryView {
        self.summary.borrow().clone()
    }

    /// Select the product if it is not selected, deselect it otherwise.
    ///
    /// Adding resolves the id against a freshly loaded catalog, so the store
    /// lock is not held while the catalog is fetched. Membership is checked
    /// again once the product is resolved. When a concurrent toggle added the
    /// same id meanwhile, the entry keeps its position and takes the product
    /// resolved last.
    pub async fn toggle(&self, id: ProductId) -> Result<Toggled, SelectionError> {
        {
            let mut selected = self.selected.lock().await;
            if let Some(pos) = selected.iter().position(|p| p.id == id) {
                selected.remove(pos);
                self.commit(&selected).await?;
                tracing::debug!("Deselected product {}", id);
                return Ok(Toggled::Removed(id));
            }
        }

        let catalog = load_catalog(self.catalog.as_ref()).await?;
        let product = catalog
            .resolve(id)
            .cloned()
            .ok_or(SelectionError::UnknownProduct(id))?;

        let mut selected = self.selected.lock().await;
        if let Some(existing) = selected.iter_mut().find(|p| p.id == id) {
            *existing = product;
            self.commit(&selected).await?;
            tracing::debug!("Product {} was selected concurrently", id);
            return Ok(Toggled::AlreadySelected(id));
        }

        selected.push(product.clone());
        self.commit(&selected).await?;
        tracing::debug!("Selected product {} ({})", id, product.name);
        Ok(Toggled::Added(product))
    }

    /// Remove the product if present. Returns whether anything was removed.
    pub async fn remove(&self, id: ProductId) -> Result<bool, SelectionError> {
        let mut selected = self.selected.lock().await;
        let before = selected.len();
        selected.retain(|p| p.id != id);
        let removed = selected.len() != before;
        self.commit(&selected).await?;
        Ok(removed)
    }

    /// Replace the selection with the record's entries resolved against
    /// `catalog`, keeping persisted order. Stale ids are dropped.
    pub async fn restore(
        &self,
        record: &SelectionRecord,
        catalog: &Catalog,
    ) -> Result<RestoreReport, SelectionError> {
        let mut report = RestoreReport::default();
        let mut restored: Vec<Product> = Vec::new();

        for id in record.ids() {
            if restored.iter().any(|p| p.id == id) {
                continue;
            }
            match catalog.resolve(id) {
                Some(product) => restored.push(product.clone()),
                None => report.dropped.push(id),
            }
        }
        report.restored = restored.len();

        if !report.dropped.is_empty() {
            tracing::debug!("Dropped stale selection entries: {:?}", report.dropped);
        }

        let mut selected = self.selected.lock().await;
        *selected = restored;
        self.commit(&selected).await?;
        Ok(report)
    }

    /// Read the persisted record from storage. A missing key is an empty record.
    pub async fn load_persisted(&self) -> Result<SelectionRecord, SelectionError> {
        let raw = self.storage.read(&self.key).await?;
        Ok(raw
            .map(|raw| SelectionRecord::decode(&raw))
            .unwrap_or_default())
    }

    /// Snapshot sufficient to rebuild the selection with [`restore`](Self::restore).
    /// `commit` writes the same record from inside the lock.
    #[cfg(test)]
    pub async fn serialize_for_persistence(&self) -> SelectionRecord {
        let selected = self.selected.lock().await;
        SelectionRecord::from_products(&selected)
    }

    pub async fn snapshot(&self) -> Vec<Product> {
        self.selected.lock().await.clone()
    }

    /// Re-render and write through. Called with the store lock held.
    async fn commit(&self, selected: &[Product]) -> Result<(), SelectionError> {
        self.summary.send_replace(render_summary(selected));

        let record = SelectionRecord::from_products(selected);
        self.storage
            .write(&self.key, &record.encode())
            .await
            .map_err(|e| {
                tracing::warn!("Selection not persisted: {}", e);
                SelectionError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::future::join_all;
    use tokio_test::assert_ok;

    use super::*;
    use crate::catalog::testing::{product, sample_products, StaticCatalogSource};

    fn store_with(
        source: Arc<StaticCatalogSource>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> SelectionStore {
        SelectionStore::new(source, storage, DEFAULT_STORAGE_KEY)
    }

    fn ids(products: &[Product]) -> Vec<u64> {
        products.iter().map(|p| p.id.0).collect()
    }

    #[tokio::test]
    async fn test_toggle_twice_round_trips() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let store = store_with(source.clone(), Arc::new(InMemoryStorage::new()));

        for id in [1, 2] {
            let before = store.snapshot().await;
            assert!(matches!(
                store.toggle(ProductId(id)).await.unwrap(),
                Toggled::Added(_)
            ));
            assert_eq!(
                store.toggle(ProductId(id)).await.unwrap(),
                Toggled::Removed(ProductId(id))
            );
            assert_eq!(store.snapshot().await, before);
        }

        // Deselecting never goes to the catalog
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_selection_keeps_pick_order() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let store = store_with(source, Arc::new(InMemoryStorage::new()));

        assert_ok!(store.toggle(ProductId(2)).await);
        assert_ok!(store.toggle(ProductId(1)).await);
        assert_eq!(ids(&store.snapshot().await), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_toggle_unknown_product() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let store = store_with(source, Arc::new(InMemoryStorage::new()));

        let err = store.toggle(ProductId(99)).await.unwrap_err();
        assert!(matches!(err, SelectionError::UnknownProduct(ProductId(99))));
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_with_catalog_offline() {
        let source = Arc::new(StaticCatalogSource::unavailable());
        let store = store_with(source, Arc::new(InMemoryStorage::new()));

        let err = store.toggle(ProductId(1)).await.unwrap_err();
        assert!(matches!(err, SelectionError::Catalog(_)));
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_toggles_never_duplicate() {
        let products: Vec<Product> = (1..=8)
            .map(|i| product(i, &format!("P{}", i), "Brand", "skincare"))
            .collect();
        let source = Arc::new(
            StaticCatalogSource::new(products).with_delay(Duration::from_millis(5)),
        );
        let store = Arc::new(store_with(source, Arc::new(InMemoryStorage::new())));

        // Each id toggled from several tasks at once; adds race against each other.
        let mut tasks = Vec::new();
        for round in 0..3 {
            for id in 1..=8u64 {
                let store = store.clone();
                tasks.push(tokio::spawn(async move {
                    if round == 0 || id % 2 == 0 {
                        store.toggle(ProductId(id)).await
                    } else {
                        Ok(Toggled::AlreadySelected(ProductId(id)))
                    }
                }));
            }
        }
        for result in join_all(tasks).await {
            assert_ok!(result.unwrap());
        }

        let selection = store.snapshot().await;
        let unique: HashSet<u64> = selection.iter().map(|p| p.id.0).collect();
        assert_eq!(unique.len(), selection.len());
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_id() {
        let source = Arc::new(
            StaticCatalogSource::new(sample_products()).with_delay(Duration::from_millis(5)),
        );
        let store = Arc::new(store_with(source, Arc::new(InMemoryStorage::new())));

        let results = join_all((0..4).map(|_| {
            let store = store.clone();
            async move { store.toggle(ProductId(1)).await.unwrap() }
        }))
        .await;

        let added = results
            .iter()
            .filter(|r| matches!(r, Toggled::Added(_)))
            .count();
        assert_eq!(added, 1);
        assert_eq!(ids(&store.snapshot().await), vec![1]);
    }

    #[tokio::test]
    async fn test_concurrent_add_keeps_latest_resolution() {
        let source = Arc::new(
            StaticCatalogSource::new(sample_products()).with_delay(Duration::from_millis(200)),
        );
        let store = Arc::new(store_with(source.clone(), Arc::new(InMemoryStorage::new())));

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.toggle(ProductId(1)).await }
        });
        tokio::time::sleep(Duration::from_millis(80)).await;
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.toggle(ProductId(1)).await }
        });

        // The first toggle has resolved by now, the second has not
        tokio::time::sleep(Duration::from_millis(160)).await;
        source.replace(vec![
            product(1, "Cleanser v2", "A", "skincare"),
            product(2, "Mascara", "B", "makeup"),
        ]);

        assert!(matches!(first.await.unwrap().unwrap(), Toggled::Added(_)));
        assert_eq!(
            second.await.unwrap().unwrap(),
            Toggled::AlreadySelected(ProductId(1))
        );

        let selection = store.snapshot().await;
        assert_eq!(ids(&selection), vec![1]);
        assert_eq!(selection[0].name, "Cleanser v2");
        assert_eq!(store.summary().items[0].name, "Cleanser v2");
    }

    #[tokio::test]
    async fn test_remove() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(source, storage.clone());

        assert_ok!(store.toggle(ProductId(1)).await);
        assert_ok!(store.toggle(ProductId(2)).await);

        assert!(store.remove(ProductId(1)).await.unwrap());
        assert!(!store.remove(ProductId(1)).await.unwrap());
        assert_eq!(ids(&store.snapshot().await), vec![2]);

        let persisted = storage.read(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(SelectionRecord::decode(&persisted).ids(), vec![ProductId(2)]);
    }

    #[tokio::test]
    async fn test_every_mutation_renders_and_persists() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(source, storage.clone());
        let mut summary = store.subscribe();

        assert_ok!(store.toggle(ProductId(1)).await);
        assert!(summary.has_changed().unwrap());
        assert_eq!(summary.borrow_and_update().items.len(), 1);
        let persisted = storage.read(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(SelectionRecord::decode(&persisted).ids(), vec![ProductId(1)]);

        // Removing something absent still re-renders and writes
        assert_ok!(store.remove(ProductId(2)).await);
        assert!(summary.has_changed().unwrap());
        assert_eq!(summary.borrow_and_update().items.len(), 1);

        assert_ok!(store.toggle(ProductId(1)).await);
        assert!(summary.borrow_and_update().items.is_empty());
        let persisted = storage.read(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        assert!(SelectionRecord::decode(&persisted).ids().is_empty());
    }

    #[tokio::test]
    async fn test_restore_of_serialized_selection() {
        let catalog = Catalog::new(vec![
            product(1, "Cleanser", "A", "skincare"),
            product(2, "Mascara", "B", "makeup"),
            product(3, "Serum", "A", "skincare"),
        ]);
        let source = Arc::new(StaticCatalogSource::new(catalog.products.clone()));
        let store = store_with(source.clone(), Arc::new(InMemoryStorage::new()));

        for id in [3, 1, 2] {
            assert_ok!(store.toggle(ProductId(id)).await);
        }
        let before = store.snapshot().await;
        let record = store.serialize_for_persistence().await;

        let fresh = store_with(source, Arc::new(InMemoryStorage::new()));
        let report = fresh.restore(&record, &catalog).await.unwrap();
        assert_eq!(report.restored, 3);
        assert!(report.dropped.is_empty());
        assert_eq!(fresh.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_restore_drops_stale_entries() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(source.clone(), storage.clone());

        assert_ok!(store.toggle(ProductId(1)).await);
        assert_ok!(store.toggle(ProductId(2)).await);
        let record = store.load_persisted().await.unwrap();
        assert_eq!(record.ids(), vec![ProductId(1), ProductId(2)]);

        // Product 2 disappears from the catalog between sessions
        let reduced = Catalog::new(vec![product(1, "Cleanser", "A", "skincare")]);
        let next = store_with(source, storage.clone());
        let report = next.restore(&record, &reduced).await.unwrap();

        assert_eq!(report.restored, 1);
        assert_eq!(report.dropped, vec![ProductId(2)]);
        assert_eq!(ids(&next.snapshot().await), vec![1]);

        let persisted = storage.read(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(SelectionRecord::decode(&persisted).ids(), vec![ProductId(1)]);
    }

    #[tokio::test]
    async fn test_restore_rehydrates_from_catalog() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let store = store_with(source, Arc::new(InMemoryStorage::new()));

        let record = SelectionRecord::decode(
            r#"[{"id": 2, "name": "Old Mascara", "brand": "Z"}, {"id": 2}, {"id": 1}]"#,
        );
        let report = store
            .restore(&record, &Catalog::new(sample_products()))
            .await
            .unwrap();

        assert_eq!(report.restored, 2);
        let selection = store.snapshot().await;
        assert_eq!(ids(&selection), vec![2, 1]);
        assert_eq!(selection[0].name, "Mascara");
        assert_eq!(selection[0].brand, "B");
    }

    #[tokio::test]
    async fn test_missing_record_is_empty() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let store = store_with(source, Arc::new(InMemoryStorage::new()));
        assert!(store.load_persisted().await.unwrap().is_empty());
    }

    struct FailingStorage;

    #[async_trait]
    impl KeyValueStorage for FailingStorage {
        async fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        async fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_memory_and_render() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let store = store_with(source, Arc::new(FailingStorage));

        let err = store.toggle(ProductId(1)).await.unwrap_err();
        assert!(matches!(err, SelectionError::Storage(_)));
        assert_eq!(ids(&store.snapshot().await), vec![1]);
        assert_eq!(store.summary().items.len(), 1);
    }

    #[tokio::test]
    async fn test_worked_example() {
        let source = Arc::new(StaticCatalogSource::new(sample_products()));
        let storage = Arc::new(InMemoryStorage::new());
        let store = store_with(source.clone(), storage.clone());

        assert_ok!(store.toggle(ProductId(1)).await);
        assert_ok!(store.toggle(ProductId(1)).await);
        assert!(store.snapshot().await.is_empty());

        assert_ok!(store.toggle(ProductId(1)).await);
        assert_ok!(store.toggle(ProductId(2)).await);

        source.replace(vec![product(1, "Cleanser", "A", "skincare")]);
        let next = store_with(source.clone(), storage);
        let record = next.load_persisted().await.unwrap();
        let catalog = load_catalog(source.as_ref()).await.unwrap();
        assert_ok!(next.restore(&record, &catalog).await);

        assert_eq!(ids(&next.snapshot().await), vec![1]);
    }
}
