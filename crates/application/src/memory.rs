//! 内存版聊天存储
//!
//! 同时实现 [`ChatRepository`] 和 [`TransactionManager`]，语义与 PostgreSQL 版本一致：
//! 事务内的写入先记入日志（journal），提交时才应用到共享表；回滚或句柄被丢弃时日志直接作废。
//! 通过 [`FaultPlan`] 可以注入失败，用来验证原子性。

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use domain::{
    Chat, ChatId, ChatMember, Message, MessageId, NewChat, NewMessage, RepositoryError,
    TransactionStage,
};
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::{
    repository::ChatRepository,
    transaction::{IsolationLevel, TransactionManager},
};

/// 注入的故障
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    pub fail_member_insert: bool,
    pub fail_member_delete: bool,
    pub fail_message_insert: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    chats: BTreeMap<ChatId, String>,
    chat_users: Vec<ChatMember>,
    messages: BTreeMap<MessageId, Message>,
}

#[derive(Debug)]
enum Mutation {
    InsertChat(Chat),
    InsertMembers(Vec<ChatMember>),
    DeleteMembers(ChatId),
    DeleteChat(ChatId),
}

impl Tables {
    /// 返回受影响的行数
    fn apply(&mut self, mutation: &Mutation) -> u64 {
        match mutation {
            Mutation::InsertChat(chat) => {
                self.chats.insert(chat.id, chat.name.clone());
                1
            }
            Mutation::InsertMembers(members) => {
                self.chat_users.extend(members.iter().cloned());
                members.len() as u64
            }
            Mutation::DeleteMembers(chat_id) => {
                let before = self.chat_users.len();
                self.chat_users.retain(|member| member.chat_id != *chat_id);
                (before - self.chat_users.len()) as u64
            }
            Mutation::DeleteChat(chat_id) => u64::from(self.chats.remove(chat_id).is_some()),
        }
    }
}

/// 内存事务句柄：开启时的快照加上本事务的写日志
#[derive(Debug)]
pub struct InMemoryTx {
    level: IsolationLevel,
    working: Tables,
    journal: Vec<Mutation>,
}

impl InMemoryTx {
    pub fn isolation_level(&self) -> IsolationLevel {
        self.level
    }

    fn record(&mut self, mutation: Mutation) -> u64 {
        let affected = self.working.apply(&mutation);
        self.journal.push(mutation);
        affected
    }
}

#[derive(Debug, Default)]
struct Counters {
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct InMemoryChatStore {
    tables: Arc<RwLock<Tables>>,
    chat_sequence: Arc<AtomicI64>,
    message_sequence: Arc<AtomicI64>,
    counters: Arc<Counters>,
    faults: FaultPlan,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn committed_count(&self) -> usize {
        self.counters.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back_count(&self) -> usize {
        self.counters.rolled_back.load(Ordering::SeqCst)
    }

    // 与 BIGSERIAL 一样，序列值在回滚后不会复用
    fn next_chat_id(&self) -> ChatId {
        ChatId::new(self.chat_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(self.message_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn commit(&self, tx: InMemoryTx) -> Result<(), RepositoryError> {
        if self.faults.fail_commit {
            return Err(RepositoryError::transaction(
                TransactionStage::Commit,
                "injected commit failure",
            ));
        }

        let mut tables = self.tables.write().await;
        for mutation in &tx.journal {
            tables.apply(mutation);
        }
        self.counters.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&self, tx: InMemoryTx) {
        if self.faults.fail_rollback {
            tracing::warn!(
                pending = tx.journal.len(),
                "transaction rollback failed: injected rollback failure"
            );
            return;
        }
        self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
    }
}

impl TransactionManager for InMemoryChatStore {
    type Tx = InMemoryTx;

    fn run_in_transaction<'a, T, E, F>(
        &'a self,
        level: IsolationLevel,
        work: F,
    ) -> BoxFuture<'a, Result<T, E>>
    where
        T: Send + 'a,
        E: From<RepositoryError> + Send + 'a,
        F: for<'t> FnOnce(&'t mut InMemoryTx) -> BoxFuture<'t, Result<T, E>> + Send + 'a,
    {
        Box::pin(async move {
            let snapshot = self.tables.read().await.clone();
            let mut tx = InMemoryTx {
                level,
                working: snapshot,
                journal: Vec::new(),
            };

            match work(&mut tx).await {
                Ok(value) => {
                    self.commit(tx).await.map_err(E::from)?;
                    Ok(value)
                }
                Err(err) => {
                    self.rollback(tx);
                    Err(err)
                }
            }
        })
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatStore {
    type Tx = InMemoryTx;

    async fn create_chat(&self, tx: &mut InMemoryTx, chat: &NewChat) -> Result<ChatId, RepositoryError> {
        let chat_id = self.next_chat_id();
        tx.record(Mutation::InsertChat(Chat {
            id: chat_id,
            name: chat.name.clone(),
        }));

        if chat.user_ids.is_empty() {
            return Ok(chat_id);
        }
        if self.faults.fail_member_insert {
            return Err(RepositoryError::storage("injected membership insert failure"));
        }

        let members = chat
            .user_ids
            .iter()
            .cloned()
            .map(|user_id| ChatMember::new(chat_id, user_id))
            .collect();
        tx.record(Mutation::InsertMembers(members));
        Ok(chat_id)
    }

    async fn delete_chat(&self, tx: &mut InMemoryTx, chat_id: ChatId) -> Result<u64, RepositoryError> {
        if self.faults.fail_member_delete {
            return Err(RepositoryError::storage("injected membership delete failure"));
        }
        tx.record(Mutation::DeleteMembers(chat_id));
        Ok(tx.record(Mutation::DeleteChat(chat_id)))
    }

    async fn send_message(&self, message: &NewMessage) -> Result<MessageId, RepositoryError> {
        if self.faults.fail_message_insert {
            return Err(RepositoryError::storage("injected message insert failure"));
        }
        let message_id = self.next_message_id();
        self.tables
            .write()
            .await
            .messages
            .insert(message_id, Message::from_new(message_id, message.clone()));
        Ok(message_id)
    }

    async fn find_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.chats.get(&chat_id).map(|name| Chat {
            id: chat_id,
            name: name.clone(),
        }))
    }

    async fn find_chats_by_name(&self, name: &str) -> Result<Vec<Chat>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .chats
            .iter()
            .filter(|(_, chat_name)| chat_name.as_str() == name)
            .map(|(id, chat_name)| Chat {
                id: *id,
                name: chat_name.clone(),
            })
            .collect())
    }

    async fn list_members(&self, chat_id: ChatId) -> Result<Vec<ChatMember>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .chat_users
            .iter()
            .filter(|member| member.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.tables.read().await.messages.get(&message_id).cloned())
    }
}
