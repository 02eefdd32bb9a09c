use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::types::{Row, Statement};

/// Result type for asynchronous backend operations.
pub type FutureResult<T> = BoxFuture<'static, Result<T>>;

/// SQL backends implement the [`Connection`] trait to execute compiled
/// statements.
///
/// A statement may contain several `;`-separated statements; backends send
/// them as one batch so a failing statement aborts the whole call.
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a query and return the resulting rows.
    fn query(&self, statement: Statement) -> FutureResult<Vec<Row>>;

    /// Execute a statement that does not return rows (e.g. `INSERT`, `MERGE`
    /// or `DELETE`) and return the number of affected rows.
    fn exec(&self, statement: Statement) -> FutureResult<u32>;
}

/// A connection participating in an open transaction.
pub trait Transaction: Connection {
    /// Commit the transaction.
    fn commit(&self) -> FutureResult<()>;

    /// Roll the transaction back.
    fn rollback(&self) -> FutureResult<()>;
}

/// Owner of connection lifecycle (pooling, retry and backoff).
///
/// Constructed by the composition root and injected into every DAO.
pub trait ConnectionProvider: Debug + Send + Sync + 'static {
    /// Acquire a connection for a single call.
    fn acquire(&self) -> FutureResult<Arc<dyn Connection>>;

    /// Begin a transaction.
    ///
    /// Providers without transaction support keep the default, which fails.
    fn begin(&self) -> FutureResult<Arc<dyn Transaction>> {
        async { Err(anyhow!("transactions not supported by this provider")) }.boxed()
    }
}

/// Run `f` inside a transaction from `provider`.
///
/// The transaction is committed when `f` succeeds and rolled back when it
/// fails. Nothing is retried.
///
/// # Errors
///
/// Returns the error from beginning the transaction, from `f`, or from
/// committing. A rollback failure is logged and the original error returned.
pub async fn with_transaction<F, T>(provider: &dyn ConnectionProvider, f: F) -> Result<T>
where
    F: AsyncFnOnce(Arc<dyn Transaction>) -> Result<T>,
{
    let tx = provider.begin().await?;

    match f(Arc::clone(&tx)).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!("rollback failed: {rollback}");
            }
            Err(err)
        }
    }
}
