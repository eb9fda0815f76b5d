//! 聊天服务核心领域模型
//!
//! 包含聊天、成员关系、消息等实体，以及仓储层统一的错误类型。

pub mod chat;
pub mod errors;
pub mod message;
pub mod value_objects;

// 重新导出常用类型
pub use chat::{Chat, ChatMember, NewChat};
pub use errors::{RepositoryError, TransactionStage};
pub use message::{Message, NewMessage};
pub use value_objects::{ChatId, MessageId, Timestamp, UserId};
