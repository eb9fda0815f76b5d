use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config::DatabaseConfig;
use domain::{
    Chat, ChatId, ChatMember, Message, MessageId, NewChat, NewMessage, RepositoryError, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres};

use application::repository::ChatRepository;

use crate::query::{self, Statement};

/// 事务句柄：`pool.begin()` 得到的 sqlx 事务，丢弃时由驱动回滚
pub type PgTx = sqlx::Transaction<'static, Postgres>;

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return RepositoryError::NotFound;
    }
    if matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    ) {
        return RepositoryError::unavailable_with_source(err.to_string(), err);
    }
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage_with_source(err.to_string(), err)
}

fn log_statement(statement: &Statement) {
    tracing::debug!(statement = statement.name(), sql = %statement.pretty(), "executing statement");
}

#[derive(Debug, FromRow)]
struct ChatRecord {
    id: i64,
    name: String,
}

impl From<ChatRecord> for Chat {
    fn from(value: ChatRecord) -> Self {
        Chat {
            id: ChatId::new(value.id),
            name: value.name,
        }
    }
}

#[derive(Debug, FromRow)]
struct MemberRecord {
    chat_id: i64,
    user_id: String,
}

impl From<MemberRecord> for ChatMember {
    fn from(value: MemberRecord) -> Self {
        ChatMember::new(ChatId::new(value.chat_id), UserId::new(value.user_id))
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    user_id: String,
    message: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRecord> for Message {
    fn from(value: MessageRecord) -> Self {
        Message {
            id: MessageId::new(value.id),
            sender_id: UserId::new(value.user_id),
            text: value.message,
            created_at: value.created_at,
        }
    }
}

/// PostgreSQL 聊天仓储。
///
/// 多表写入在调用方传入的事务上执行；单条写入和读取直接使用连接池。
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    type Tx = PgTx;

    async fn create_chat(&self, tx: &mut PgTx, chat: &NewChat) -> Result<ChatId, RepositoryError> {
        let insert_chat = query::insert_chat(&chat.name)?;
        log_statement(&insert_chat);
        let chat_id: i64 = insert_chat
            .fetch_scalar(&mut **tx)
            .await
            .map_err(map_sqlx_err)?;
        let chat_id = ChatId::new(chat_id);

        // 空成员列表无法构造多行 INSERT，直接跳过
        if !chat.user_ids.is_empty() {
            let insert_members = query::insert_chat_members(chat_id, &chat.user_ids)?;
            log_statement(&insert_members);
            insert_members
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_err)?;
        }

        Ok(chat_id)
    }

    async fn delete_chat(&self, tx: &mut PgTx, chat_id: ChatId) -> Result<u64, RepositoryError> {
        let delete_members = query::delete_chat_members(chat_id)?;
        log_statement(&delete_members);
        delete_members
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_err)?;

        let delete_chat = query::delete_chat(chat_id)?;
        log_statement(&delete_chat);
        let result = delete_chat
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn send_message(&self, message: &NewMessage) -> Result<MessageId, RepositoryError> {
        let insert_message = query::insert_message(message)?;
        log_statement(&insert_message);
        let message_id: i64 = insert_message
            .fetch_scalar(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(MessageId::new(message_id))
    }

    async fn find_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let record = sqlx::query_as::<_, ChatRecord>("SELECT id, name FROM chat WHERE id = $1")
            .bind(chat_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(record.map(Chat::from))
    }

    async fn find_chats_by_name(&self, name: &str) -> Result<Vec<Chat>, RepositoryError> {
        let records =
            sqlx::query_as::<_, ChatRecord>("SELECT id, name FROM chat WHERE name = $1 ORDER BY id")
                .bind(name)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Chat::from).collect())
    }

    async fn list_members(&self, chat_id: ChatId) -> Result<Vec<ChatMember>, RepositoryError> {
        let records = sqlx::query_as::<_, MemberRecord>(
            "SELECT chat_id, user_id FROM chat_users WHERE chat_id = $1 ORDER BY user_id",
        )
        .bind(chat_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(ChatMember::from).collect())
    }

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, user_id, message, created_at FROM messages WHERE id = $1",
        )
        .bind(message_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Message::from))
    }
}

/// 按配置创建连接池。建池时会先建立一条连接，数据库不可达会直接报错。
pub async fn create_pg_pool(config: &DatabaseConfig) -> Result<PgPool, RepositoryError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .map_err(map_sqlx_err)
}
