//! View models
//!
//! Pure functions from widget state to what the page paints. Nothing here holds
//! state of its own except the catalog browser's expand flags.

pub mod browser;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{Product, ProductId};

pub use browser::{CardEvent, CardIntent, CatalogBrowser};

/// One product card in the catalog grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub image: String,
    pub description: String,
    pub selected: bool,
    /// Whether the details panel is open
    pub expanded: bool,
}

/// One row of the selected-products list, with its remove control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub id: ProductId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub items: Vec<SummaryItem>,
    /// The routine trigger only makes sense with at least one item
    pub can_generate: bool,
}

/// Render the selected-products list
pub fn render_summary(selected: &[Product]) -> SummaryView {
    SummaryView {
        items: selected
            .iter()
            .map(|p| SummaryItem {
                id: p.id,
                name: p.name.clone(),
            })
            .collect(),
        can_generate: !selected.is_empty(),
    }
}

/// Render the catalog grid
pub fn render_catalog(
    products: &[Product],
    selected: &HashSet<ProductId>,
    expanded: &HashSet<ProductId>,
) -> Vec<CardView> {
    products
        .iter()
        .map(|p| CardView {
            id: p.id,
            name: p.name.clone(),
            brand: p.brand.clone(),
            image: p.image.clone(),
            description: p.description.clone(),
            selected: selected.contains(&p.id),
            expanded: expanded.contains(&p.id),
        })
        .collect()
}
