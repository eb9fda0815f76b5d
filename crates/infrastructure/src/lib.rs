//! 基础设施层实现。
//!
//! 提供 PostgreSQL 连接池、SQL 语句构造、聊天仓储和事务管理器，
//! 实现应用层定义的 `ChatRepository` 与 `TransactionManager` 接口。

pub mod migrations;
pub mod query;
pub mod repository;
pub mod transaction;

pub use migrations::MIGRATOR;
pub use query::{SqlValue, Statement};
pub use repository::{create_pg_pool, PgChatRepository, PgTx};
pub use transaction::PgTransactionManager;
