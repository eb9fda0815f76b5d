use async_trait::async_trait;
use domain::{Chat, ChatId, ChatMember, Message, MessageId, NewChat, NewMessage, RepositoryError};

/// 聊天存储能力。
///
/// 写操作中涉及多张表的两个方法显式接收事务句柄 `tx`，由
/// [`TransactionManager`](crate::transaction::TransactionManager) 负责开启、提交和回滚；
/// 仓储本身从不自行开启事务。单条语句的写入和读取直接走连接池。
#[cfg_attr(test, mockall::automock(type Tx = ();))]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// 事务句柄，与事务管理器的 `Tx` 相同
    type Tx: Send;

    /// 插入聊天行，再插入全部成员行，返回数据库生成的聊天ID
    async fn create_chat(&self, tx: &mut Self::Tx, chat: &NewChat) -> Result<ChatId, RepositoryError>;

    /// 先删成员行再删聊天行，返回删除的聊天行数（不存在时为 0）
    async fn delete_chat(&self, tx: &mut Self::Tx, chat_id: ChatId) -> Result<u64, RepositoryError>;

    async fn send_message(&self, message: &NewMessage) -> Result<MessageId, RepositoryError>;

    async fn find_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, RepositoryError>;

    async fn find_chats_by_name(&self, name: &str) -> Result<Vec<Chat>, RepositoryError>;

    async fn list_members(&self, chat_id: ChatId) -> Result<Vec<ChatMember>, RepositoryError>;

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>, RepositoryError>;
}
