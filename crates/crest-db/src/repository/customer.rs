//! # Customer Repository (Ledger Party)
//!
//! Database operations for customers and their debt ledger.
//!
//! ## Debt Invariant
//! `debt_cents` moves in exactly two ways:
//! - **up** by `total_cents` when a credit sale completes (sale workflow)
//! - **down** by a recorded payment through [`CustomerRepository::reduce_debt`]
//!
//! Both paths run inside a transaction; a payment and its debt decrement
//! are never observable separately.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbError;
use crate::repository::sequence;
use crate::workflow::SALE_COLUMNS;
use crest_core::validation::{validate_code, validate_name, validate_payment_amount, validate_search_query};
use crest_core::{
    new_entity_id, CoreError, CoreResult, Customer, DocumentKind, Payment, PaymentMethod, Sale,
};

/// Every column of `customers`, in struct order.
const CUSTOMER_COLUMNS: &str = "id, code, name, phone, email, address, \
     credit_limit_cents, debt_cents, is_active, created_at, updated_at";

/// Input for creating a customer. When `code` is `None` the next customer
/// code is generated ("C001", "C002", ...).
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub code: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub credit_limit_cents: i64,
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets an active customer by ID.
    pub async fn get_by_id(&self, id: &str) -> CoreResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(customer)
    }

    /// Gets an active customer by exact business code (case-sensitive).
    pub async fn get_by_code(&self, code: &str) -> CoreResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE code = ?1 AND is_active = 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(customer)
    }

    /// Searches active customers by code-or-name substring, ordered by
    /// name. An empty query lists active customers.
    pub async fn search(&self, query: &str, limit: u32) -> CoreResult<Vec<Customer>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching customers");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", query);

        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?1) \
             ORDER BY name LIMIT ?2"
        ))
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(customers)
    }

    /// Lists active customers sorted by name.
    pub async fn list_active(&self, limit: u32) -> CoreResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(customers)
    }

    /// Lists active customers carrying debt, largest balance first.
    pub async fn with_debt(&self) -> CoreResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers \
             WHERE is_active = 1 AND debt_cents > 0 \
             ORDER BY debt_cents DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(customers)
    }

    /// Inserts a new customer, generating a business code when none is
    /// supplied.
    pub async fn insert(&self, new: NewCustomer) -> CoreResult<Customer> {
        validate_name(&new.name)?;
        if let Some(code) = &new.code {
            validate_code(code)?;
        }
        if new.credit_limit_cents < 0 {
            return Err(crest_core::ValidationError::MustBePositive {
                field: "credit limit".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // Skip counter values occupied by manually supplied codes, same
        // as the catalog insert; bounded by the counter's 999 ceiling.
        let code = match new.code {
            Some(code) => code,
            None => loop {
                let candidate =
                    sequence::next_code(&mut tx, DocumentKind::CustomerCode, now.date_naive())
                        .await?;
                let taken: Option<i64> =
                    sqlx::query_scalar("SELECT 1 FROM customers WHERE code = ?1")
                        .bind(&candidate)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(DbError::from)?;
                if taken.is_none() {
                    break candidate;
                }
            },
        };

        let customer = Customer {
            id: new_entity_id(),
            code,
            name: new.name,
            phone: new.phone,
            email: new.email,
            address: new.address,
            credit_limit_cents: new.credit_limit_cents,
            debt_cents: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %customer.code, name = %customer.name, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (id, code, name, phone, email, address, \
             credit_limit_cents, debt_cents, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&customer.id)
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.credit_limit_cents)
        .bind(customer.debt_cents)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(customer)
    }

    /// Updates an existing customer's contact details and credit limit.
    /// Debt is never written here.
    pub async fn update(&self, customer: &Customer) -> CoreResult<()> {
        validate_name(&customer.name)?;

        debug!(id = %customer.id, "Updating customer");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE customers SET name = ?2, phone = ?3, email = ?4, address = ?5, \
             credit_limit_cents = ?6, updated_at = ?7 \
             WHERE id = ?1 AND is_active = 1",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.credit_limit_cents)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(customer.id.clone()));
        }

        Ok(())
    }

    /// Soft-deletes a customer. Sale and payment history stays intact.
    pub async fn deactivate(&self, id: &str) -> CoreResult<()> {
        debug!(id = %id, "Deactivating customer");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE customers SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Records a payment against a customer's debt.
    ///
    /// ## Atomicity
    /// The payment row (with a fresh payment number) and the debt
    /// decrement commit together or not at all.
    ///
    /// ## Errors
    /// - `CustomerNotFound` if the customer is absent or inactive
    /// - `PaymentExceedsDebt` if `amount_cents` is more than the current
    ///   debt: overpaying is rejected, never clamped
    pub async fn reduce_debt(
        &self,
        customer_id: &str,
        user_id: &str,
        amount_cents: i64,
        method: PaymentMethod,
        remarks: Option<String>,
    ) -> CoreResult<Payment> {
        validate_payment_amount(amount_cents)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let debt_cents: Option<i64> = sqlx::query_scalar(
            "SELECT debt_cents FROM customers WHERE id = ?1 AND is_active = 1",
        )
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::from)?;

        let debt_cents = match debt_cents {
            Some(debt) => debt,
            None => return Err(CoreError::CustomerNotFound(customer_id.to_string())),
        };

        if amount_cents > debt_cents {
            return Err(CoreError::PaymentExceedsDebt {
                customer_id: customer_id.to_string(),
                debt_cents,
                amount_cents,
            });
        }

        let payment_number =
            sequence::next_code(&mut tx, DocumentKind::PaymentNumber, now.date_naive()).await?;

        let payment = Payment {
            id: new_entity_id(),
            payment_number,
            customer_id: customer_id.to_string(),
            user_id: user_id.to_string(),
            amount_cents,
            method,
            remarks,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO payments (id, payment_number, customer_id, user_id, \
             amount_cents, method, remarks, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&payment.id)
        .bind(&payment.payment_number)
        .bind(&payment.customer_id)
        .bind(&payment.user_id)
        .bind(payment.amount_cents)
        .bind(payment.method)
        .bind(&payment.remarks)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query(
            "UPDATE customers SET debt_cents = debt_cents - ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(customer_id)
        .bind(amount_cents)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            customer_id = %customer_id,
            payment_number = %payment.payment_number,
            amount = %payment.amount(),
            "Payment recorded"
        );

        Ok(payment)
    }

    /// Lists payments recorded for a customer, newest first.
    pub async fn payments(&self, customer_id: &str) -> CoreResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT id, payment_number, customer_id, user_id, amount_cents, method, remarks, created_at \
             FROM payments WHERE customer_id = ?1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(payments)
    }

    /// Completed sales for a customer, newest first.
    pub async fn sales_history(&self, customer_id: &str) -> CoreResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE customer_id = ?1 AND status = 'completed' \
             ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
