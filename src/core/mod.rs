//! Core widget components
//!
//! This module wires the catalog, the selection store and the conversation
//! session into one page-scoped widget.

mod widget;

#[cfg(test)]
pub(crate) use widget::testing;
pub use widget::{RoutineWidget, WidgetError};
