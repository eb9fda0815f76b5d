//! 应用层实现。
//!
//! 定义仓储与事务管理器的抽象，并提供围绕它们的聊天用例服务。
//! 多表写操作的事务边界在这里确定，具体的存储实现由基础设施层提供。

pub mod error;
pub mod memory;
pub mod repository;
pub mod services;
pub mod transaction;

pub use error::ApplicationError;
pub use memory::{FaultPlan, InMemoryChatStore, InMemoryTx};
pub use repository::ChatRepository;
pub use services::{
    ChatOperations, ChatService, ChatServiceDependencies, CreateChatRequest, SendMessageRequest,
};
pub use transaction::{IsolationLevel, TransactionManager};
