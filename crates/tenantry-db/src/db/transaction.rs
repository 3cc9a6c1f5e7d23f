//! Database transaction utilities
//!
//! Multi-step writes (lead conversion) go through [`TransactionGuard`], which
//! maps failures into `ProvisionError` and logs transactions abandoned on an
//! early return.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tenantry_core::ProvisionError;

/// A database transaction wrapper with explicit commit.
///
/// Dropping the guard without calling [`commit`](Self::commit) rolls the
/// transaction back (sqlx queues the rollback on the connection).
///
/// # Example
///
/// ```ignore
/// use tenantry_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), tenantry_core::ProvisionError> {
///     let mut tx = TransactionGuard::begin(pool, "example").await?;
///     sqlx::query("UPDATE ...").execute(tx.conn()?).await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard<'a> {
    transaction: Option<Transaction<'a, Postgres>>,
    operation: &'static str,
}

impl<'a> TransactionGuard<'a> {
    /// Begin a new database transaction for `operation`.
    pub async fn begin(pool: &'a PgPool, operation: &'static str) -> Result<Self, ProvisionError> {
        let transaction = pool.begin().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Failed to begin database transaction");
            ProvisionError::Database(e)
        })?;

        Ok(Self {
            transaction: Some(transaction),
            operation,
        })
    }

    /// Connection to run statements on inside the transaction.
    pub fn conn(&mut self) -> Result<&mut PgConnection, ProvisionError> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            ProvisionError::Internal(format!(
                "Transaction for {} was already finished",
                self.operation
            ))
        })
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), ProvisionError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await.map_err(|e| {
                tracing::error!(operation = self.operation, error = %e, "Failed to commit database transaction");
                ProvisionError::Database(e)
            })?;
        }
        Ok(())
    }

    /// Roll the transaction back explicitly.
    pub async fn rollback(mut self) -> Result<(), ProvisionError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await.map_err(|e| {
                tracing::error!(operation = self.operation, error = %e, "Failed to roll back database transaction");
                ProvisionError::Database(e)
            })?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::debug!(
                operation = self.operation,
                "Transaction dropped without commit - rolling back"
            );
        }
    }
}
