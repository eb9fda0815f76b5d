use application::transaction::{IsolationLevel, TransactionManager};
use domain::{RepositoryError, TransactionStage};
use futures::future::BoxFuture;
use sqlx::PgPool;

use crate::repository::{map_sqlx_err, PgTx};

fn begin_failed(err: sqlx::Error) -> RepositoryError {
    // 拿不到连接归为瞬时错误，其余归为事务开启失败
    if matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    ) {
        return map_sqlx_err(err);
    }
    RepositoryError::transaction_with_source(TransactionStage::Begin, err.to_string(), err)
}

/// 基于 sqlx 事务的事务管理器
#[derive(Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TransactionManager for PgTransactionManager {
    type Tx = PgTx;

    fn run_in_transaction<'a, T, E, F>(
        &'a self,
        level: IsolationLevel,
        work: F,
    ) -> BoxFuture<'a, Result<T, E>>
    where
        T: Send + 'a,
        E: From<RepositoryError> + Send + 'a,
        F: for<'t> FnOnce(&'t mut PgTx) -> BoxFuture<'t, Result<T, E>> + Send + 'a,
    {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(|e| E::from(begin_failed(e)))?;

            // 必须是事务内的第一条语句
            let set_level = format!("SET TRANSACTION ISOLATION LEVEL {}", level.as_sql());
            sqlx::query(&set_level)
                .execute(&mut *tx)
                .await
                .map_err(|e| E::from(begin_failed(e)))?;

            match work(&mut tx).await {
                Ok(value) => {
                    tx.commit().await.map_err(|e| {
                        E::from(RepositoryError::transaction_with_source(
                            TransactionStage::Commit,
                            e.to_string(),
                            e,
                        ))
                    })?;
                    tracing::trace!(isolation = %level, "transaction committed");
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "transaction rollback failed");
                    }
                    Err(err)
                }
            }
        })
    }
}
