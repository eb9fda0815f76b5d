//! 事务边界抽象
//!
//! 服务层把一组仓储调用包装成一个“工作单元”交给 [`TransactionManager`]，
//! 由它负责开启事务、设置隔离级别、提交或回滚。工作单元拿到的是显式的
//! `&mut Tx` 句柄，嵌套的仓储调用都在同一个事务里执行。

use std::fmt;

use domain::RepositoryError;
use futures::future::BoxFuture;

/// 事务隔离级别。本系统只使用 [`IsolationLevel::ReadCommitted`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// 事务管理器
///
/// 约定：
/// - 工作单元返回 `Err` 时回滚，并把该错误原样返回；
/// - 工作单元返回 `Ok` 时提交，提交失败作为本次操作的错误返回；
/// - 回滚失败只记录日志，不会覆盖主结果；
/// - 工作单元的 future 被丢弃（取消、超时）时事务句柄随之丢弃，不会被提交；
/// - 本层不做任何重试。
pub trait TransactionManager: Send + Sync {
    /// 传给工作单元的事务句柄
    type Tx: Send;

    fn run_in_transaction<'a, T, E, F>(
        &'a self,
        level: IsolationLevel,
        work: F,
    ) -> BoxFuture<'a, Result<T, E>>
    where
        T: Send + 'a,
        E: From<RepositoryError> + Send + 'a,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> BoxFuture<'t, Result<T, E>> + Send + 'a;

    fn read_committed<'a, T, E, F>(&'a self, work: F) -> BoxFuture<'a, Result<T, E>>
    where
        T: Send + 'a,
        E: From<RepositoryError> + Send + 'a,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> BoxFuture<'t, Result<T, E>> + Send + 'a,
    {
        self.run_in_transaction(IsolationLevel::ReadCommitted, work)
    }
}
