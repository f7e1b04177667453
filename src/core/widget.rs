//! The widget: catalog browser, selection store and conversation session wired
//! together for one page session.
//!
//! Lifecycle:
//! 1. `new` builds an empty widget
//! 2. `init` restores the persisted selection against the current catalog
//! 3. UI events arrive through the methods below

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::catalog::{filter_by_category, load_catalog, CatalogError, CatalogSource, ProductId};
use crate::config::WidgetConfig;
use crate::conversation::{ConversationSession, DisplayEntry, Outcome, SessionError};
use crate::providers::ChatService;
use crate::selection::{KeyValueStorage, RestoreReport, SelectionError, SelectionStore, Toggled};
use crate::view::{CardEvent, CardIntent, CardView, CatalogBrowser, SummaryView};

#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Product {0} is not on screen")]
    NotShown(ProductId),
}

/// Response to a card click
#[derive(Debug, Clone, Serialize)]
pub struct CardUpdate {
    pub card: Option<CardView>,
    pub summary: SummaryView,
}

pub struct RoutineWidget {
    catalog: Arc<dyn CatalogSource>,
    selection: SelectionStore,
    browser: Mutex<CatalogBrowser>,
    session: ConversationSession,
}

impl RoutineWidget {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        storage: Arc<dyn KeyValueStorage>,
        chat: Arc<dyn ChatService>,
        config: &WidgetConfig,
    ) -> Self {
        let selection = SelectionStore::new(catalog.clone(), storage, config.storage.key.clone());
        let session = ConversationSession::new(
            chat,
            config.prompts.routine_instruction.clone(),
            &config.prompts.chat_system,
        );

        Self {
            catalog,
            selection,
            browser: Mutex::new(CatalogBrowser::new()),
            session,
        }
    }

    /// Restore the persisted selection. Fails without touching storage when
    /// the catalog cannot be loaded.
    pub async fn init(&self) -> Result<RestoreReport, WidgetError> {
        let record = self.selection.load_persisted().await?;
        let catalog = load_catalog(self.catalog.as_ref()).await?;
        let report = self.selection.restore(&record, &catalog).await?;

        tracing::info!(
            "Restored {} selected product(s), dropped {} stale",
            report.restored,
            report.dropped.len()
        );
        Ok(report)
    }

    #[cfg(test)]
    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    /// Categories for the selector
    pub async fn categories(&self) -> Result<Vec<String>, WidgetError> {
        let catalog = load_catalog(self.catalog.as_ref()).await?;
        Ok(catalog.categories())
    }

    /// Apply a category filter and re-render the grid
    pub async fn show_category(&self, category: &str) -> Result<Vec<CardView>, WidgetError> {
        let catalog = load_catalog(self.catalog.as_ref()).await?;
        let products = filter_by_category(&catalog, category);
        let selected = self.selected_ids().await;

        let mut browser = self.browser.lock().await;
        browser.show(products);
        tracing::debug!("Showing {} product(s) in {}", browser.products().len(), category);
        Ok(browser.cards(&selected))
    }

    /// The grid as currently shown
    pub async fn cards(&self) -> Vec<CardView> {
        let selected = self.selected_ids().await;
        self.browser.lock().await.cards(&selected)
    }

    /// Handle a click on a card
    pub async fn card_event(&self, event: CardEvent) -> Result<CardUpdate, WidgetError> {
        let intent = self.browser.lock().await.dispatch(event);

        let id = match intent {
            CardIntent::Ignored => {
                let id = match event {
                    CardEvent::Select(id) | CardEvent::Details(id) => id,
                };
                return Err(WidgetError::NotShown(id));
            }
            CardIntent::DetailsToggled { id, expanded } => {
                tracing::debug!("Details for product {} {}", id, if expanded { "opened" } else { "closed" });
                id
            }
            CardIntent::ToggleSelection(id) => {
                match self.selection.toggle(id).await? {
                    Toggled::Added(product) => tracing::info!("Selected {}", product.name),
                    Toggled::Removed(id) => tracing::info!("Deselected product {}", id),
                    Toggled::AlreadySelected(_) => {}
                }
                id
            }
        };

        let selected = self.selected_ids().await;
        let card = self.browser.lock().await.card(id, &selected);
        Ok(CardUpdate {
            card,
            summary: self.selection.summary(),
        })
    }

    /// The remove control in the selected-products list
    pub async fn remove(&self, id: ProductId) -> Result<SummaryView, WidgetError> {
        self.selection.remove(id).await?;
        Ok(self.selection.summary())
    }

    pub fn summary(&self) -> SummaryView {
        self.selection.summary()
    }

    pub async fn generate_routine(&self) -> Result<Outcome, WidgetError> {
        let selection = self.selection.snapshot().await;
        Ok(self.session.generate_routine(&selection).await?)
    }

    pub async fn send_message(&self, text: &str) -> Option<Outcome> {
        self.session.send_message(text).await
    }

    pub async fn display_log(&self) -> Vec<DisplayEntry> {
        self.session.display_log().await
    }

    async fn selected_ids(&self) -> HashSet<ProductId> {
        self.selection
            .snapshot()
            .await
            .into_iter()
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;

    use crate::conversation::Message;
    use crate::providers::{ChatError, ChatService};

    /// Chat service that echoes the last user turn and counts calls
    #[derive(Default)]
    pub struct EchoChat {
        pub calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ChatService for EchoChat {
        async fn complete(&self, messages: &[Message]) -> Result<Option<String>, ChatError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(messages.last().map(|m| format!("echo: {}", m.content)))
        }
    }
}
