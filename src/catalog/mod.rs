//! Product catalog loading and filtering
//!
//! The catalog is a static JSON document of the form
//! `{ "products": [ { id, name, brand, category, image, description } ] }`.
//! It is fetched fresh every time an operation needs it; nothing is cached.

mod source;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use source::{FileCatalogSource, HttpCatalogSource};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog source unavailable: {0}")]
    SourceUnavailable(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::SourceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::SourceUnavailable(format!("Failed to parse catalog: {}", err))
    }
}

/// Stable product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        ProductId(id)
    }
}

/// A catalog entry. Owned by the catalog source and never mutated by the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
}

/// A loaded catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
}

impl Catalog {
    #[cfg(test)]
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Parse the static catalog document
    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Look up a product by id
    pub fn resolve(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Distinct categories in the order they first appear
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for product in &self.products {
            if !categories.iter().any(|c| c == &product.category) {
                categories.push(product.category.clone());
            }
        }
        categories
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Where the catalog document comes from
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable location, used in logs
    fn location(&self) -> String;

    /// Fetch the raw catalog document
    async fn fetch(&self) -> Result<String, CatalogError>;
}

/// Fetch and parse the catalog. No partial catalog is ever returned.
pub async fn load_catalog(source: &dyn CatalogSource) -> Result<Catalog, CatalogError> {
    let body = source.fetch().await.map_err(|e| {
        tracing::warn!("Catalog fetch from {} failed: {}", source.location(), e);
        e
    })?;

    let catalog = Catalog::from_json(&body).map_err(|e| {
        tracing::warn!("Catalog from {} is malformed: {}", source.location(), e);
        e
    })?;

    if catalog.is_empty() {
        tracing::warn!("Catalog from {} lists no products", source.location());
    } else {
        tracing::debug!("Loaded {} product(s) from {}", catalog.len(), source.location());
    }
    Ok(catalog)
}

/// All products whose category equals `category` exactly
pub fn filter_by_category(catalog: &Catalog, category: &str) -> Vec<Product> {
    catalog
        .products
        .iter()
        .filter(|p| p.category == category)
        .cloned()
        .collect()
}

/// Build a catalog source from a configured location: URLs are fetched over
/// HTTP, anything else is read from disk.
pub fn source_from_location(location: &str, timeout_secs: u64) -> Box<dyn CatalogSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpCatalogSource::new(location, timeout_secs))
    } else {
        Box::new(FileCatalogSource::new(location))
    }
}
