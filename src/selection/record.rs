//! Persisted selection record
//!
//! Written as a JSON array of product snapshots. When reading it back only the
//! `id` of each entry is trusted; the rest is re-resolved against the catalog.

use serde_json::Value;

use crate::catalog::{Product, ProductId};

/// Snapshot of a selection, in selection order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionRecord {
    /// Product snapshots as captured at save time
    pub entries: Vec<Value>,
}

impl SelectionRecord {
    pub fn from_products(products: &[Product]) -> Self {
        let entries = products
            .iter()
            .filter_map(|p| serde_json::to_value(p).ok())
            .collect();
        Self { entries }
    }

    /// Decode a stored value. Anything that is not a JSON array decodes to an
    /// empty record.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(entries)) => Self { entries },
            Ok(Value::Null) => Self::default(),
            Ok(other) => {
                tracing::warn!("Ignoring persisted selection of unexpected shape: {}", other);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable persisted selection: {}", e);
                Self::default()
            }
        }
    }

    pub fn encode(&self) -> String {
        Value::Array(self.entries.clone()).to_string()
    }

    /// Identifiers in persisted order. Entries without a usable id are skipped.
    pub fn ids(&self) -> Vec<ProductId> {
        self.entries.iter().filter_map(entry_id).collect()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_id(entry: &Value) -> Option<ProductId> {
    match entry.get("id")? {
        Value::Number(n) => n.as_u64().map(ProductId),
        Value::String(s) => s.trim().parse().ok().map(ProductId),
        _ => None,
    }
}
