use std::collections::HashSet;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::import;
use crate::models::{ImportProduct, NewProduct, Product, ProductFilters, UpdateProduct};

/// Flat-file product store. The whole catalog is one JSON array on disk,
/// mirrored in memory behind a single `RwLock`. Mutations hold the write
/// lock across the read-modify-write *and* the persist, so concurrent
/// writers are serialized instead of clobbering each other.
pub struct ProductStore {
    path: PathBuf,
    products: RwLock<Vec<Product>>,
}

impl ProductStore {
    /// Open the store at `path`, loading whatever is on disk. A missing
    /// file starts the catalog empty; an unreadable or unparsable one is
    /// logged and also starts empty rather than failing startup.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let products = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<Vec<Product>>(&raw) {
                Ok(products) => products,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Data file is not a valid product array, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Data file unreadable, starting empty");
                Vec::new()
            }
        };

        Ok(Self {
            path,
            products: RwLock::new(products),
        })
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// All products, with the optional list filters applied.
    pub async fn list(&self, filters: &ProductFilters) -> Vec<Product> {
        let products = self.products.read().await;
        products
            .iter()
            .filter(|p| {
                filters
                    .category
                    .as_deref()
                    .map_or(true, |c| p.category == c)
            })
            .filter(|p| filters.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| filters.max_price.map_or(true, |max| p.price <= max))
            .skip(filters.offset.unwrap_or(0))
            .take(filters.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// The whole catalog, unfiltered (exports, imports, tests).
    pub async fn all(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn get(&self, id: u64) -> AppResult<Product> {
        self.products
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    pub async fn create(&self, payload: NewProduct) -> AppResult<Product> {
        let mut products = self.products.write().await;

        let id = next_id(&products);
        let product = Product {
            id,
            name: payload.name,
            price: payload.price,
            image: payload.image,
            description: payload.description,
            category: payload.category,
        };
        products.push(product.clone());

        self.persist(&products).await?;
        Ok(product)
    }

    /// Shallow-merge `patch` into the stored product. The id is never touched.
    pub async fn update(&self, id: u64, patch: UpdateProduct) -> AppResult<Product> {
        let mut products = self.products.write().await;

        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(image) = patch.image {
            product.image = image;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        let updated = product.clone();

        self.persist(&products).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: u64) -> AppResult<()> {
        let mut products = self.products.write().await;

        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(AppError::NotFound(format!("Product {} not found", id)));
        }

        self.persist(&products).await?;
        Ok(())
    }

    /// Append import records to the catalog, assigning fresh ids to records
    /// lacking one or colliding with an existing id. Returns
    /// `(imported, total)`.
    pub async fn merge(&self, records: Vec<ImportProduct>) -> AppResult<(usize, usize)> {
        let mut products = self.products.write().await;

        let existing: HashSet<u64> = products.iter().map(|p| p.id).collect();
        let incoming = import::materialize(records, &existing);
        let imported = incoming.len();
        products.extend(incoming);

        self.persist(&products).await?;
        Ok((imported, products.len()))
    }

    /// Discard the catalog and substitute the import records wholesale.
    /// Returns `(imported, total)`.
    pub async fn replace_all(&self, records: Vec<ImportProduct>) -> AppResult<(usize, usize)> {
        let mut products = self.products.write().await;

        *products = import::materialize(records, &HashSet::new());

        self.persist(&products).await?;
        Ok((products.len(), products.len()))
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Serialize the array pretty-printed and swap it in with an atomic
    /// rename, so a crash mid-write cannot leave a torn file behind.
    async fn persist(&self, products: &[Product]) -> AppResult<()> {
        let json = serde_json::to_string_pretty(products)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn next_id(products: &[Product]) -> u64 {
    products.iter().map(|p| p.id).max().unwrap_or(0) + 1
}
