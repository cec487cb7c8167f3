use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{ImportProduct, Product};

// ── Import mode ───────────────────────────────────────────────────────────────

/// Strategy for a bulk import: `merge` appends into the existing catalog,
/// `replace` substitutes it wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Merge,
    Replace,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImportParams {
    #[serde(default)]
    pub mode: ImportMode,
}

// ── Payload parsing ───────────────────────────────────────────────────────────

/// Inline JSON import body: `{"products": [...]}`.
#[derive(Debug, Deserialize)]
struct ImportBody {
    products: Vec<ImportProduct>,
}

/// Parse a JSON import payload. Uploaded files may be a bare array;
/// inline bodies wrap the array in `{"products": [...]}`. Both are accepted
/// for both entry points.
pub fn parse_json(bytes: &[u8]) -> AppResult<Vec<ImportProduct>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let records = if value.is_array() {
        serde_json::from_value::<Vec<ImportProduct>>(value)?
    } else {
        serde_json::from_value::<ImportBody>(value)?.products
    };
    Ok(records)
}

/// Parse a CSV import payload. Expects a header row with the columns
/// `id,name,price,image,description,category`; `id` (and any column other
/// than `name`) may be empty or absent.
pub fn parse_csv(bytes: &[u8]) -> AppResult<Vec<ImportProduct>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ImportProduct = row?;
        records.push(record);
    }
    Ok(records)
}

// ── Id assignment ─────────────────────────────────────────────────────────────

/// Turn import records into stored products, assigning ids where needed.
///
/// A record keeps its supplied id when it collides with neither an existing
/// id nor one already taken by an earlier record of the same batch. Records
/// without an id, and colliding ones, get sequential ids one past the
/// running maximum. The result never duplicates an id.
pub fn materialize(records: Vec<ImportProduct>, existing_ids: &HashSet<u64>) -> Vec<Product> {
    let mut seen: HashSet<u64> = existing_ids.clone();
    let mut max_id = seen.iter().copied().max().unwrap_or(0);

    records
        .into_iter()
        .map(|record| {
            let id = match record.id {
                Some(id) if !seen.contains(&id) => id,
                _ => max_id + 1,
            };
            seen.insert(id);
            max_id = max_id.max(id);
            record.into_product(id)
        })
        .collect()
}

/// Reject records that would make no sense in the catalog regardless of mode.
pub fn validate(records: &[ImportProduct]) -> AppResult<()> {
    for (i, record) in records.iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "record {}: name must not be empty",
                i
            )));
        }
        if record.price.is_some_and(|p| p < 0.0) {
            return Err(AppError::BadRequest(format!(
                "record {}: price must be >= 0",
                i
            )));
        }
    }
    Ok(())
}
