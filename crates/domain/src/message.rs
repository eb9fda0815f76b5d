use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageId, Timestamp, UserId};

/// 待写入的消息。消息只追加，不修改也不删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub text: String,
    pub created_at: Timestamp,
}

impl NewMessage {
    pub fn new(sender_id: impl Into<UserId>, text: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            sender_id: sender_id.into(),
            text: text.into(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: Timestamp,
}

impl Message {
    pub fn from_new(id: MessageId, message: NewMessage) -> Self {
        Self {
            id,
            sender_id: message.sender_id,
            text: message.text,
            created_at: message.created_at,
        }
    }
}
