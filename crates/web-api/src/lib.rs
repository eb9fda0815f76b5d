//! Web API 层。
//!
//! 提供 Axum 路由，校验请求后委托给应用层的聊天用例服务。

mod error;
mod routes;
mod state;

pub use error::{ApiError, ErrorBody};
pub use routes::router;
pub use state::AppState;
