use serde::{Deserialize, Serialize};

/// Core catalog entity. Ids are small integers assigned by the store
/// (max existing id + 1); clients never pick them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// POST body. Only `name` is required; a client-supplied `id` is ignored
/// (unknown fields are dropped during deserialization).
#[derive(Debug, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// PUT body: shallow merge, omitted fields keep their stored value.
/// `id` is not a field here, so it can never be overwritten.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// One bulk-import record, from a JSON array or a CSV row. The optional
/// `price` lets CSV rows leave the column empty; it defaults to 0.0.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportProduct {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

impl ImportProduct {
    /// Materialize into a stored product under the given id.
    pub fn into_product(self, id: u64) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price.unwrap_or(0.0),
            image: self.image,
            description: self.description,
            category: self.category,
        }
    }
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
