//! # Sale Posting Workflow
//!
//! The three-step lifecycle of a sale document:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                                                                 │
//! │   create()              complete()                              │
//! │  ──────────▶  pending  ────────────▶  completed                 │
//! │                  │                                              │
//! │                  │ cancel()                                     │
//! │                  ▼                                              │
//! │              cancelled                                          │
//! │                                                                 │
//! │  pending:    document exists, no stock or debt touched          │
//! │  completed:  stock decremented, credit debt posted — terminal   │
//! │  cancelled:  side-effect free tombstone — terminal              │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Boundaries
//! Each transition is one database transaction. `complete()` in
//! particular writes the status flip, every stock decrement and the
//! optional debt increase together; an insufficient-stock failure on
//! the last line item rolls back all of them and the sale stays
//! `pending`.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::repository::sequence;
use crest_core::validation::{validate_discount_cents, validate_item_count, validate_quantity};
use crest_core::{
    new_entity_id, CoreError, CoreResult, Customer, DocumentKind, Money, PaymentMethod, PriceTier,
    Product, Quantity, Sale, SaleItem, SaleStatus,
};

/// Every column of `sales`, in struct order. Shared with the customer
/// repository's sales history query.
pub(crate) const SALE_COLUMNS: &str = "id, sale_number, customer_id, user_id, price_tier, \
     payment_method, subtotal_cents, discount_cents, total_cents, paid_cents, change_cents, \
     status, remarks, created_at, updated_at, completed_at";

const SALE_ITEM_COLUMNS: &str =
    "id, sale_id, product_id, name_snapshot, unit_price_cents, quantity_milli, \
     line_total_cents, created_at";

/// One requested line of a sale before posting. Prices are never taken
/// from the caller; they are resolved from the catalog at create time.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub product_id: String,
    pub quantity: Quantity,
}

/// A sale document together with its line items.
#[derive(Debug, Clone)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Workflow for posting, completing and cancelling sales.
#[derive(Debug, Clone)]
pub struct SaleWorkflow {
    pool: SqlitePool,
}

impl SaleWorkflow {
    /// Creates a new SaleWorkflow.
    pub fn new(pool: SqlitePool) -> Self {
        SaleWorkflow { pool }
    }

    /// Posts a new pending sale.
    ///
    /// Resolves each candidate against the catalog inside one
    /// transaction: unit prices come from the product's tier price,
    /// line totals use half-up rounding, and the document gets the next
    /// daily sale number. Stock and debt are untouched until
    /// [`complete`](Self::complete).
    ///
    /// ## Errors
    /// - `ProductNotFound` if any candidate references a missing or
    ///   inactive product; the whole sale is rejected, never a partial
    ///   document
    /// - `CustomerNotFound` if a customer id is given but absent/inactive
    /// - `Validation` for an empty cart, non-positive quantities or a
    ///   negative discount
    pub async fn create(
        &self,
        user_id: &str,
        customer_id: Option<&str>,
        price_tier: PriceTier,
        payment_method: PaymentMethod,
        discount_cents: i64,
        items: &[CandidateItem],
    ) -> CoreResult<SaleWithItems> {
        validate_item_count(items.len())?;
        validate_discount_cents(discount_cents)?;
        for item in items {
            validate_quantity(item.quantity)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        if let Some(customer_id) = customer_id {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1 AND is_active = 1")
                    .bind(customer_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(DbError::from)?;
            if exists.is_none() {
                return Err(CoreError::CustomerNotFound(customer_id.to_string()));
            }
        }

        // Resolve every line against the live catalog before writing
        // anything. Prices are snapshotted onto the line items so later
        // catalog edits never change a posted document.
        let mut subtotal = Money::zero();
        let mut resolved: Vec<(Product, Money, Quantity, Money)> = Vec::with_capacity(items.len());
        for item in items {
            let product = fetch_active_product(&mut tx, &item.product_id).await?;
            let unit_price = product.price_for(price_tier);
            let line_total = unit_price.line_total(item.quantity);
            subtotal += line_total;
            resolved.push((product, unit_price, item.quantity, line_total));
        }

        // A discount past the subtotal would post a negative total, and a
        // negative total on a credit sale would shrink the customer's debt.
        if discount_cents > subtotal.cents() {
            return Err(crest_core::ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: subtotal.cents(),
            }
            .into());
        }

        let total = subtotal - Money::from_cents(discount_cents);
        let sale_number =
            sequence::next_code(&mut tx, DocumentKind::SaleNumber, now.date_naive()).await?;

        let sale = Sale {
            id: new_entity_id(),
            sale_number,
            customer_id: customer_id.map(str::to_string),
            user_id: user_id.to_string(),
            price_tier,
            payment_method,
            subtotal_cents: subtotal.cents(),
            discount_cents,
            total_cents: total.cents(),
            paid_cents: 0,
            change_cents: 0,
            status: SaleStatus::Pending,
            remarks: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        sqlx::query(
            "INSERT INTO sales (id, sale_number, customer_id, user_id, price_tier, \
             payment_method, subtotal_cents, discount_cents, total_cents, paid_cents, \
             change_cents, status, remarks, created_at, updated_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&sale.id)
        .bind(&sale.sale_number)
        .bind(&sale.customer_id)
        .bind(&sale.user_id)
        .bind(sale.price_tier)
        .bind(sale.payment_method)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.paid_cents)
        .bind(sale.change_cents)
        .bind(sale.status)
        .bind(&sale.remarks)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let mut sale_items = Vec::with_capacity(resolved.len());
        for (product, unit_price, quantity, line_total) in resolved {
            let item = SaleItem {
                id: new_entity_id(),
                sale_id: sale.id.clone(),
                product_id: product.id,
                name_snapshot: product.name,
                unit_price_cents: unit_price.cents(),
                quantity_milli: quantity.milli(),
                line_total_cents: line_total.cents(),
                created_at: now,
            };

            sqlx::query(
                "INSERT INTO sale_items (id, sale_id, product_id, name_snapshot, \
                 unit_price_cents, quantity_milli, line_total_cents, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity_milli)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

            sale_items.push(item);
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_number = %sale.sale_number,
            total = %sale.total(),
            items = sale_items.len(),
            "Sale created"
        );

        Ok(SaleWithItems {
            sale,
            items: sale_items,
        })
    }

    /// Completes a pending sale: flips the status, records the tendered
    /// amount and change, decrements stock for every line and posts
    /// credit debt when the sale is on credit.
    ///
    /// `paid_cents` below the total is accepted; `change_cents` then
    /// goes negative and records the shortfall.
    ///
    /// ## Errors
    /// - `SaleNotFound` / `InvalidSaleStatus` for missing or already
    ///   terminal sales (completing twice fails, it does not double-post)
    /// - `InsufficientStock` if any line cannot be covered; the whole
    ///   transaction rolls back and the sale stays `pending`
    pub async fn complete(&self, sale_id: &str, paid_cents: i64) -> CoreResult<Sale> {
        // Zero tender is valid (a credit sale can pay nothing up front);
        // negative tender is not.
        if paid_cents < 0 {
            return Err(crest_core::ValidationError::MustBePositive {
                field: "paid amount".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let sale = fetch_sale(&mut tx, sale_id).await?;
        if sale.status != SaleStatus::Pending {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale_id.to_string(),
                current_status: sale.status.to_string(),
            });
        }

        let change_cents = paid_cents - sale.total_cents;

        // Guarded on `pending` so a racing completion of the same sale
        // observes zero affected rows instead of double-posting.
        let result = sqlx::query(
            "UPDATE sales SET status = 'completed', paid_cents = ?2, change_cents = ?3, \
             completed_at = ?4, updated_at = ?4 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(sale_id)
        .bind(paid_cents)
        .bind(change_cents)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale_id.to_string(),
                current_status: sale.status.to_string(),
            });
        }

        let items = fetch_items(&mut tx, sale_id).await?;
        for item in &items {
            decrement_stock(&mut tx, &item.product_id, item.quantity().units_ceil()).await?;
        }

        if sale.payment_method == PaymentMethod::Credit {
            if let Some(customer_id) = &sale.customer_id {
                sqlx::query(
                    "UPDATE customers SET debt_cents = debt_cents + ?2, updated_at = ?3 \
                     WHERE id = ?1",
                )
                .bind(customer_id)
                .bind(sale.total_cents)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?;

                let customer = sqlx::query_as::<_, Customer>(
                    "SELECT id, code, name, phone, email, address, credit_limit_cents, \
                     debt_cents, is_active, created_at, updated_at \
                     FROM customers WHERE id = ?1",
                )
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

                if let Some(customer) = customer {
                    if customer.debt_cents > customer.credit_limit_cents {
                        warn!(
                            customer = %customer.code,
                            debt = %customer.debt(),
                            limit = %customer.credit_limit(),
                            "Credit sale pushed customer past credit limit"
                        );
                    }
                }
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_number = %sale.sale_number,
            paid = %Money::from_cents(paid_cents),
            change = %Money::from_cents(change_cents),
            "Sale completed"
        );

        let mut completed = sale;
        completed.status = SaleStatus::Completed;
        completed.paid_cents = paid_cents;
        completed.change_cents = change_cents;
        completed.completed_at = Some(now);
        completed.updated_at = now;
        Ok(completed)
    }

    /// Cancels a pending sale. No stock or debt was posted yet, so the
    /// only write is the status flip.
    pub async fn cancel(&self, sale_id: &str) -> CoreResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE sales SET status = 'cancelled', updated_at = ?2 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(sale_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            // Distinguish a missing sale from a terminal one.
            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM sales WHERE id = ?1")
                    .bind(sale_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(DbError::from)?;

            return match status {
                None => Err(CoreError::SaleNotFound(sale_id.to_string())),
                Some(current_status) => Err(CoreError::InvalidSaleStatus {
                    sale_id: sale_id.to_string(),
                    current_status,
                }),
            };
        }

        debug!(sale_id = %sale_id, "Sale cancelled");
        Ok(())
    }

    /// Fetches a sale with its line items.
    pub async fn get_by_id(&self, sale_id: &str) -> CoreResult<Option<SaleWithItems>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        let sale = match sale {
            Some(sale) => sale,
            None => return Ok(None),
        };

        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(Some(SaleWithItems { sale, items }))
    }

    /// Completed sales in a created-at window, newest first.
    pub async fn completed_between(
        &self,
        from: chrono::DateTime<Utc>,
        to: chrono::DateTime<Utc>,
    ) -> CoreResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE status = 'completed' AND created_at >= ?1 AND created_at <= ?2 \
             ORDER BY created_at DESC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(sales)
    }
}

async fn fetch_sale(tx: &mut Transaction<'_, Sqlite>, sale_id: &str) -> CoreResult<Sale> {
    let sale = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
    ))
    .bind(sale_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(DbError::from)?;

    sale.ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))
}

async fn fetch_items(
    tx: &mut Transaction<'_, Sqlite>,
    sale_id: &str,
) -> CoreResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at"
    ))
    .bind(sale_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(DbError::from)?;

    Ok(items)
}

async fn fetch_active_product(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
) -> CoreResult<Product> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, code, name, description, unit, cost_cents, normal_cents, \
         employee_cents, wholesale_cents, stock_qty, min_stock, is_active, \
         created_at, updated_at \
         FROM products WHERE id = ?1 AND is_active = 1",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(DbError::from)?;

    product.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))
}

/// Decrements stock by whole units inside the caller's transaction.
/// The guard keeps stock from ever going negative.
async fn decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    units: i64,
) -> CoreResult<()> {
    let result = sqlx::query(
        "UPDATE products SET stock_qty = stock_qty - ?2, updated_at = ?3 \
         WHERE id = ?1 AND stock_qty - ?2 >= 0",
    )
    .bind(product_id)
    .bind(units)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        let product: Option<(String, i64)> =
            sqlx::query_as("SELECT code, stock_qty FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(DbError::from)?;

        return match product {
            Some((code, available)) => Err(CoreError::InsufficientStock {
                code,
                available,
                requested: units,
            }),
            None => Err(CoreError::ProductNotFound(product_id.to_string())),
        };
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
