use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, UserId};

/// 待创建的聊天：名称加初始成员列表。
///
/// 字段在进入应用层之前已由接口层校验，这里不再重复检查。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChat {
    pub name: String,
    pub user_ids: Vec<UserId>,
}

impl NewChat {
    pub fn new<I, U>(name: impl Into<String>, user_ids: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Self {
            name: name.into(),
            user_ids: user_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// 已持久化的聊天。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
}

/// 聊天成员关系，(chat_id, user_id) 二元组。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMember {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

impl ChatMember {
    pub fn new(chat_id: ChatId, user_id: UserId) -> Self {
        Self { chat_id, user_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chat_collects_members() {
        let chat = NewChat::new("team-chat", ["u1", "u2", "u3"]);

        assert_eq!(chat.name, "team-chat");
        assert_eq!(
            chat.user_ids,
            vec![UserId::new("u1"), UserId::new("u2"), UserId::new("u3")]
        );
    }
}
