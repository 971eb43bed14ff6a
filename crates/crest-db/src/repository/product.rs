//! # Product Repository (Catalog)
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Exact lookup by code (case-sensitive) and by id, active records only
//! - Substring search over code-or-name, ordered by name
//! - Guarded stock deltas (stock never goes negative)
//! - Low-stock query against the reorder threshold
//! - Soft delete: deactivation, never row removal, so historical sale
//!   items keep a valid product reference

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbError;
use crate::repository::sequence;
use crest_core::validation::{validate_code, validate_name, validate_price_cents, validate_search_query};
use crest_core::{new_entity_id, CoreError, CoreResult, DocumentKind, Product};

/// Every column of `products`, in struct order.
const PRODUCT_COLUMNS: &str = "id, code, name, description, unit, \
     cost_cents, normal_cents, employee_cents, wholesale_cents, \
     stock_qty, min_stock, is_active, created_at, updated_at";

/// Input for creating a product. When `code` is `None` the next product
/// code is generated ("P001", "P002", ...).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub cost_cents: i64,
    pub normal_cents: i64,
    pub employee_cents: i64,
    pub wholesale_cents: i64,
    pub stock_qty: i64,
    pub min_stock: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets an active product by its ID. Soft-deleted products are
    /// invisible here.
    pub async fn get_by_id(&self, id: &str) -> CoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(product)
    }

    /// Gets an active product by its exact business code. Case-sensitive:
    /// "P001" and "p001" are different lookups.
    pub async fn get_by_code(&self, code: &str) -> CoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1 AND is_active = 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(product)
    }

    /// Searches active products by code-or-name substring, ordered by name.
    /// An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> CoreResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", query);

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?1) \
             ORDER BY name LIMIT ?2"
        ))
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> CoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(products)
    }

    /// Lists active products at or below their reorder threshold,
    /// emptiest shelf first.
    pub async fn low_stock(&self) -> CoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock_qty <= min_stock \
             ORDER BY stock_qty"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(products)
    }

    /// Inserts a new product, generating a business code when none is
    /// supplied. Code generation and insert share one transaction.
    pub async fn insert(&self, new: NewProduct) -> CoreResult<Product> {
        validate_name(&new.name)?;
        validate_price_cents(new.cost_cents)?;
        validate_price_cents(new.normal_cents)?;
        validate_price_cents(new.employee_cents)?;
        validate_price_cents(new.wholesale_cents)?;
        if let Some(code) = &new.code {
            validate_code(code)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // Manually supplied codes can occupy values the counter has not
        // issued yet; skip past any taken candidate inside this
        // transaction so generation never wedges on a collision. The
        // loop is bounded: the counter errors out past 999.
        let code = match new.code {
            Some(code) => code,
            None => loop {
                let candidate =
                    sequence::next_code(&mut tx, DocumentKind::ProductCode, now.date_naive())
                        .await?;
                let taken: Option<i64> =
                    sqlx::query_scalar("SELECT 1 FROM products WHERE code = ?1")
                        .bind(&candidate)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(DbError::from)?;
                if taken.is_none() {
                    break candidate;
                }
            },
        };

        let product = Product {
            id: new_entity_id(),
            code,
            name: new.name,
            description: new.description,
            unit: new.unit,
            cost_cents: new.cost_cents,
            normal_cents: new.normal_cents,
            employee_cents: new.employee_cents,
            wholesale_cents: new.wholesale_cents,
            stock_qty: new.stock_qty,
            min_stock: new.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %product.code, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, code, name, description, unit, \
             cost_cents, normal_cents, employee_cents, wholesale_cents, \
             stock_qty, min_stock, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.cost_cents)
        .bind(product.normal_cents)
        .bind(product.employee_cents)
        .bind(product.wholesale_cents)
        .bind(product.stock_qty)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(product)
    }

    /// Updates an existing product's mutable fields. Stock changes go
    /// through `update_stock` instead.
    pub async fn update(&self, product: &Product) -> CoreResult<()> {
        validate_name(&product.name)?;
        validate_price_cents(product.cost_cents)?;
        validate_price_cents(product.normal_cents)?;
        validate_price_cents(product.employee_cents)?;
        validate_price_cents(product.wholesale_cents)?;

        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET name = ?2, description = ?3, unit = ?4, \
             cost_cents = ?5, normal_cents = ?6, employee_cents = ?7, \
             wholesale_cents = ?8, min_stock = ?9, updated_at = ?10 \
             WHERE id = ?1 AND is_active = 1",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(product.cost_cents)
        .bind(product.normal_cents)
        .bind(product.employee_cents)
        .bind(product.wholesale_cents)
        .bind(product.min_stock)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }

        Ok(())
    }

    /// Applies a signed stock delta (negative for sales, positive for
    /// restocking). The statement itself guards the non-negative stock
    /// invariant, so concurrent sellers cannot race it below zero.
    pub async fn update_stock(&self, id: &str, delta: i64) -> CoreResult<()> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET stock_qty = stock_qty + ?2, updated_at = ?3 \
             WHERE id = ?1 AND stock_qty + ?2 >= 0",
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                Some(product) => Err(CoreError::InsufficientStock {
                    code: product.code,
                    available: product.stock_qty,
                    requested: -delta,
                }),
                None => Err(CoreError::ProductNotFound(id.to_string())),
            };
        }

        Ok(())
    }

    /// Soft-deletes a product. The row stays for referential integrity of
    /// historical sale items; all lookups stop returning it.
    pub async fn deactivate(&self, id: &str) -> CoreResult<()> {
        debug!(id = %id, "Deactivating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(name: &str, normal_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            code: None,
            name: name.to_string(),
            description: None,
            unit: "pcs".to_string(),
            cost_cents: normal_cents / 2,
            normal_cents,
            employee_cents: normal_cents - 100,
            wholesale_cents: normal_cents - 200,
            stock_qty: stock,
            min_stock: 2,
        }
    }

    #[tokio::test]
    async fn test_insert_generates_sequential_codes() {
        let db = test_db().await;
        let repo = db.catalog();

        let a = repo.insert(new_product("Rice 1kg", 20000, 10)).await.unwrap();
        let b = repo.insert(new_product("Sugar 1kg", 9000, 10)).await.unwrap();

        assert_eq!(a.code, "P001");
        assert_eq!(b.code, "P002");
    }

    #[tokio::test]
    async fn test_generated_codes_skip_manually_taken_values() {
        let db = test_db().await;
        let repo = db.catalog();

        // A manual code sits on the value the counter would issue second.
        let mut manual = new_product("Manual", 5000, 1);
        manual.code = Some("P002".to_string());
        repo.insert(manual).await.unwrap();

        let a = repo.insert(new_product("Rice 1kg", 20000, 10)).await.unwrap();
        let b = repo.insert(new_product("Sugar 1kg", 9000, 10)).await.unwrap();

        assert_eq!(a.code, "P001");
        // Generation hops over the occupied P002 instead of failing.
        assert_eq!(b.code, "P003");
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_sensitive() {
        let db = test_db().await;
        let repo = db.catalog();

        repo.insert(new_product("Rice 1kg", 20000, 10)).await.unwrap();

        assert!(repo.get_by_code("P001").await.unwrap().is_some());
        assert!(repo.get_by_code("p001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected_by_schema() {
        let db = test_db().await;
        let repo = db.catalog();

        let mut first = new_product("Rice 1kg", 20000, 10);
        first.code = Some("RICE".to_string());
        repo.insert(first).await.unwrap();

        let mut second = new_product("Other rice", 21000, 5);
        second.code = Some("RICE".to_string());
        let err = repo.insert(second).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[tokio::test]
    async fn test_search_matches_code_or_name() {
        let db = test_db().await;
        let repo = db.catalog();

        repo.insert(new_product("Basmati Rice", 20000, 10)).await.unwrap();
        repo.insert(new_product("Sugar", 9000, 10)).await.unwrap();

        let by_name = repo.search("rice", 20).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Basmati Rice");

        let by_code = repo.search("P002", 20).await.unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].name, "Sugar");

        assert!(repo.search("flour", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_boundary_is_inclusive() {
        let db = test_db().await;
        let repo = db.catalog();

        // min_stock is 2 in the fixture
        repo.insert(new_product("At threshold", 1000, 2)).await.unwrap();
        repo.insert(new_product("Above threshold", 1000, 3)).await.unwrap();

        let low = repo.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "At threshold");
    }

    #[tokio::test]
    async fn test_stock_delta_never_goes_negative() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = repo.insert(new_product("Rice 1kg", 20000, 3)).await.unwrap();

        repo.update_stock(&p.id, -2).await.unwrap();
        let err = repo.update_stock(&p.id, -2).await.unwrap_err();

        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {other}"),
        }

        // Restocking still works.
        repo.update_stock(&p.id, 5).await.unwrap();
        assert_eq!(repo.get_by_id(&p.id).await.unwrap().unwrap().stock_qty, 6);
    }

    #[tokio::test]
    async fn test_deactivation_hides_product_from_lookups() {
        let db = test_db().await;
        let repo = db.catalog();

        let p = repo.insert(new_product("Rice 1kg", 20000, 10)).await.unwrap();
        repo.deactivate(&p.id).await.unwrap();

        assert!(repo.get_by_id(&p.id).await.unwrap().is_none());
        assert!(repo.get_by_code("P001").await.unwrap().is_none());
        assert!(repo.search("rice", 20).await.unwrap().is_empty());

        // Deactivating twice reports not-found.
        assert!(matches!(
            repo.deactivate(&p.id).await.unwrap_err(),
            CoreError::ProductNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_input() {
        let db = test_db().await;
        let repo = db.catalog();

        let mut bad_name = new_product("", 1000, 1);
        bad_name.code = Some("X1".to_string());
        assert!(matches!(
            repo.insert(bad_name).await.unwrap_err(),
            CoreError::Validation(_)
        ));

        let mut bad_price = new_product("Rice", 1000, 1);
        bad_price.normal_cents = -1;
        assert!(matches!(
            repo.insert(bad_price).await.unwrap_err(),
            CoreError::Validation(_)
        ));
    }
}
