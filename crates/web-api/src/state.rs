use std::sync::Arc;

use application::ChatOperations;

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<dyn ChatOperations>,
}

impl AppState {
    pub fn new(chat_service: Arc<dyn ChatOperations>) -> Self {
        Self { chat_service }
    }
}
