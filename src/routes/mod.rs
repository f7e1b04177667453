//! API routes
//!
//! The page talks to the widget through these endpoints and paints the view
//! models they return.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, ProductId};
use crate::conversation::{DisplayEntry, Outcome, SessionError};
use crate::core::WidgetError;
use crate::selection::SelectionError;
use crate::view::{CardEvent, CardView, SummaryView};
use crate::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    catalog: String,
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A domain error turned into an HTTP response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<WidgetError> for ApiError {
    fn from(err: WidgetError) -> Self {
        let status = match &err {
            WidgetError::Catalog(CatalogError::SourceUnavailable(_))
            | WidgetError::Selection(SelectionError::Catalog(_)) => StatusCode::SERVICE_UNAVAILABLE,
            WidgetError::Selection(SelectionError::UnknownProduct(_)) | WidgetError::NotShown(_) => {
                StatusCode::NOT_FOUND
            }
            WidgetError::Selection(SelectionError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            WidgetError::Session(SessionError::PreconditionNotMet) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        catalog: state.config.widget.catalog.source.clone(),
    })
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.widget.categories().await?))
}

/// With a category: apply the filter. Without: the grid as last shown.
async fn catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<CardView>>, ApiError> {
    let cards = match query.category {
        Some(category) => state.widget.show_category(&category).await?,
        None => state.widget.cards().await,
    };
    Ok(Json(cards))
}

async fn select(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Response, ApiError> {
    let update = state.widget.card_event(CardEvent::Select(ProductId(id))).await?;
    Ok(Json(update).into_response())
}

async fn details(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Response, ApiError> {
    let update = state.widget.card_event(CardEvent::Details(ProductId(id))).await?;
    Ok(Json(update.card).into_response())
}

async fn selection(State(state): State<AppState>) -> Json<SummaryView> {
    Json(state.widget.summary())
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<SummaryView>, ApiError> {
    Ok(Json(state.widget.remove(ProductId(id)).await?))
}

async fn routine(State(state): State<AppState>) -> Result<Json<Outcome>, ApiError> {
    Ok(Json(state.widget.generate_routine().await?))
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    match state.widget.send_message(&request.message).await {
        Some(outcome) => Json(outcome).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn chat_log(State(state): State<AppState>) -> Json<Vec<DisplayEntry>> {
    Json(state.widget.display_log().await)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/categories", get(categories))
        .route("/catalog", get(catalog))
        .route("/catalog/:id/select", post(select))
        .route("/catalog/:id/details", post(details))
        .route("/selection", get(selection))
        .route("/selection/:id", delete(remove))
        .route("/routine", post(routine))
        .route("/chat", post(chat).get(chat_log))
}
