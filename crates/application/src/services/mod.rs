mod chat_service;


pub use chat_service::{
    ChatOperations, ChatService, ChatServiceDependencies, CreateChatRequest, SendMessageRequest,
};
