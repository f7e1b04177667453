//! Catalog browser
//!
//! Tracks which products are on screen and which cards have their details
//! open. The expand flags are local to the current render: showing a new set of
//! products starts every card collapsed.

use std::collections::HashSet;

use crate::catalog::{Product, ProductId};

use super::{render_catalog, CardView};

/// A click on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEvent {
    /// Anywhere on the card body
    Select(ProductId),
    /// The "details" control
    Details(ProductId),
}

/// What the owner of the browser should do about an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardIntent {
    /// Forward to the selection store
    ToggleSelection(ProductId),
    /// Handled locally
    DetailsToggled { id: ProductId, expanded: bool },
    /// The card is not on screen
    Ignored,
}

#[derive(Debug, Default)]
pub struct CatalogBrowser {
    products: Vec<Product>,
    expanded: HashSet<ProductId>,
}

impl CatalogBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace what is on screen. Every card starts collapsed.
    pub fn show(&mut self, products: Vec<Product>) {
        self.products = products;
        self.expanded.clear();
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn dispatch(&mut self, event: CardEvent) -> CardIntent {
        match event {
            CardEvent::Select(id) => {
                if self.is_shown(id) {
                    CardIntent::ToggleSelection(id)
                } else {
                    CardIntent::Ignored
                }
            }
            CardEvent::Details(id) => {
                if !self.is_shown(id) {
                    return CardIntent::Ignored;
                }
                let expanded = if self.expanded.remove(&id) {
                    false
                } else {
                    self.expanded.insert(id);
                    true
                };
                CardIntent::DetailsToggled { id, expanded }
            }
        }
    }

    /// Render the grid against the current selection
    pub fn cards(&self, selected: &HashSet<ProductId>) -> Vec<CardView> {
        render_catalog(&self.products, selected, &self.expanded)
    }

    /// Render a single card
    pub fn card(&self, id: ProductId, selected: &HashSet<ProductId>) -> Option<CardView> {
        self.cards(selected).into_iter().find(|c| c.id == id)
    }

    fn is_shown(&self, id: ProductId) -> bool {
        self.products.iter().any(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{product, sample_products};

    #[test]
    fn test_details_toggle_is_local() {
        let mut browser = CatalogBrowser::new();
        browser.show(sample_products());

        assert_eq!(
            browser.dispatch(CardEvent::Details(ProductId(1))),
            CardIntent::DetailsToggled {
                id: ProductId(1),
                expanded: true
            }
        );
        let cards = browser.cards(&HashSet::new());
        assert!(cards[0].expanded);
        assert!(!cards[0].selected);

        assert_eq!(
            browser.dispatch(CardEvent::Details(ProductId(1))),
            CardIntent::DetailsToggled {
                id: ProductId(1),
                expanded: false
            }
        );
    }

    #[test]
    fn test_select_forwards_to_store() {
        let mut browser = CatalogBrowser::new();
        browser.show(vec![product(2, "Mascara", "B", "makeup")]);

        assert_eq!(
            browser.dispatch(CardEvent::Select(ProductId(2))),
            CardIntent::ToggleSelection(ProductId(2))
        );
        assert_eq!(
            browser.dispatch(CardEvent::Select(ProductId(1))),
            CardIntent::Ignored
        );
    }

    #[test]
    fn test_rerender_collapses_cards() {
        let mut browser = CatalogBrowser::new();
        browser.show(sample_products());
        browser.dispatch(CardEvent::Details(ProductId(2)));
        assert!(browser.card(ProductId(2), &HashSet::new()).unwrap().expanded);

        browser.show(sample_products());
        assert!(!browser.card(ProductId(2), &HashSet::new()).unwrap().expanded);
    }
}
