use std::sync::Arc;

use async_trait::async_trait;
use domain::{ChatId, MessageId, NewChat, NewMessage, Timestamp, UserId};

use crate::{
    error::ApplicationError,
    repository::ChatRepository,
    transaction::TransactionManager,
};

#[derive(Debug, Clone)]
pub struct CreateChatRequest {
    pub name: String,
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub text: String,
    pub timestamp: Timestamp,
}

/// 接口层可调用的三个聊天用例。
///
/// 请求在到达这里之前已经过校验，实现方不再重复检查。
#[async_trait]
pub trait ChatOperations: Send + Sync {
    async fn create_chat(&self, request: CreateChatRequest) -> Result<ChatId, ApplicationError>;

    /// 删除不存在的聊天同样返回成功
    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApplicationError>;

    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<MessageId, ApplicationError>;
}

pub struct ChatServiceDependencies<R, M> {
    pub repository: Arc<R>,
    pub transaction_manager: M,
}

/// 聊天服务：把多语句写操作放进 read-committed 事务，单语句写操作直接透传。
pub struct ChatService<R, M> {
    repository: Arc<R>,
    transaction_manager: M,
}

impl<R, M> ChatService<R, M>
where
    R: ChatRepository + 'static,
    M: TransactionManager<Tx = R::Tx>,
{
    pub fn new(deps: ChatServiceDependencies<R, M>) -> Self {
        Self {
            repository: deps.repository,
            transaction_manager: deps.transaction_manager,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }
}

#[async_trait]
impl<R, M> ChatOperations for ChatService<R, M>
where
    R: ChatRepository + 'static,
    M: TransactionManager<Tx = R::Tx> + 'static,
{
    async fn create_chat(&self, request: CreateChatRequest) -> Result<ChatId, ApplicationError> {
        let chat = NewChat::new(request.name, request.user_ids);
        let repository = Arc::clone(&self.repository);

        let chat_id = self
            .transaction_manager
            .read_committed(move |tx: &mut R::Tx| {
                Box::pin(async move {
                    repository
                        .create_chat(tx, &chat)
                        .await
                        .map_err(ApplicationError::from)
                })
            })
            .await?;

        tracing::debug!(chat_id = %chat_id, "chat created");
        Ok(chat_id)
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ApplicationError> {
        let repository = Arc::clone(&self.repository);

        let removed = self
            .transaction_manager
            .read_committed(move |tx: &mut R::Tx| {
                Box::pin(async move {
                    repository
                        .delete_chat(tx, chat_id)
                        .await
                        .map_err(ApplicationError::from)
                })
            })
            .await?;

        if removed == 0 {
            tracing::debug!(chat_id = %chat_id, "chat did not exist, nothing deleted");
        } else {
            tracing::debug!(chat_id = %chat_id, "chat deleted");
        }
        Ok(())
    }

    async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<MessageId, ApplicationError> {
        // 单条 INSERT 由数据库自身保证原子性，不开启事务
        let message = NewMessage::new(UserId::new(request.sender_id), request.text, request.timestamp);
        let message_id = self.repository.send_message(&message).await?;

        tracing::debug!(message_id = %message_id, sender = %message.sender_id, "message stored");
        Ok(message_id)
    }
}
