//! Routine Builder - product catalog widget service
//!
//! Lets a page browse a product catalog, keep a persisted selection of
//! products, and turn that selection into a routine through a remote
//! chat-completion endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod config;
mod conversation;
mod core;
mod providers;
mod routes;
mod selection;
mod view;

use crate::core::RoutineWidget;
use catalog::{source_from_location, CatalogSource};
use config::Config;
use providers::{ChatEndpointConfig, HttpChatService};
use selection::SqliteStorage;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub widget: Arc<RoutineWidget>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "routine_builder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let storage = Arc::new(SqliteStorage::new(&config.data_dir.join("selection.db")).await?);

    let catalog_source: Arc<dyn CatalogSource> = Arc::from(source_from_location(
        &config.widget.catalog.source,
        config.widget.catalog.timeout_secs,
    ));
    tracing::info!("Catalog source: {}", catalog_source.location());

    let chat = Arc::new(HttpChatService::new(ChatEndpointConfig {
        endpoint: config.widget.chat.endpoint.clone(),
        api_key: config.widget.chat_api_key(),
        model: config.widget.chat.model.clone(),
        timeout_secs: config.widget.chat.timeout_secs,
    }));

    let widget = Arc::new(RoutineWidget::new(catalog_source, storage, chat, &config.widget));

    // A missing catalog at startup leaves the stored record untouched for the next run.
    // A failed write-back happens after the restore, so the summary says what survived.
    if let Err(e) = widget.init().await {
        tracing::warn!(
            "Selection restore incomplete, starting with {} selected product(s): {}",
            widget.summary().items.len(),
            e
        );
    }

    let state = AppState { config, widget };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Routine Builder running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
