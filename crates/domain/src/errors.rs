//! 领域模型错误定义
//!
//! 仓储层的所有失败都收敛到 [`RepositoryError`]，上层原样向外传播。

use std::fmt;

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 事务生命周期中出错的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStage {
    Begin,
    Commit,
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStage::Begin => f.write_str("begin"),
            TransactionStage::Commit => f.write_str("commit"),
        }
    }
}

/// 仓储错误类型
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 请求的记录不存在
    #[error("resource not found")]
    NotFound,

    /// 唯一约束冲突
    #[error("resource already exists")]
    Conflict,

    /// 连接池耗尽或网络故障，属于瞬时错误
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// SQL 语句构造失败，正确的构建中不应出现
    #[error("failed to build statement {name}: {message}")]
    Statement { name: &'static str, message: String },

    /// 语句执行失败（约束违反等）
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// 开启或提交事务失败
    #[error("transaction {stage} failed: {message}")]
    Transaction {
        stage: TransactionStage,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unavailable_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn statement(name: &'static str, message: impl Into<String>) -> Self {
        Self::Statement {
            name,
            message: message.into(),
        }
    }

    pub fn transaction(stage: TransactionStage, message: impl Into<String>) -> Self {
        Self::Transaction {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn transaction_with_source<E>(
        stage: TransactionStage,
        message: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transaction {
            stage,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 是否为瞬时错误（调用方可自行决定是否重试）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::Unavailable { .. }
                | RepositoryError::Transaction {
                    stage: TransactionStage::Begin,
                    ..
                }
        )
    }
}
