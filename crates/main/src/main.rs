//! 主应用程序入口
//!
//! 加载配置、建立数据库连接池，启动 Axum Web API 服务。

use std::{path::PathBuf, sync::Arc};

use application::{ChatService, ChatServiceDependencies};
use clap::Parser;
use config::AppConfig;
use infrastructure::{create_pg_pool, PgChatRepository, PgTransactionManager};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[derive(Debug, Parser)]
#[command(name = "chat-server", version, about = "Chat write service")]
struct Args {
    /// 启动前加载的环境变量文件
    #[arg(long = "config-path", env = "CHAT_CONFIG_PATH", default_value = ".env")]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 日志尚未初始化，先记下结果
    let env_file = dotenv::from_path(&args.config_path);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match env_file {
        Ok(()) => tracing::info!(path = %args.config_path.display(), "loaded env file"),
        Err(err) => tracing::warn!(
            path = %args.config_path.display(),
            error = %err,
            "env file not loaded, using process environment"
        ),
    }

    let config = AppConfig::load()?;
    tracing::info!(
        address = %config.server.address(),
        database = %config.database.redacted_url(),
        max_connections = config.database.max_connections,
        "configuration loaded"
    );

    let pool = create_pg_pool(&config.database).await?;

    let chat_service = ChatService::new(ChatServiceDependencies {
        repository: Arc::new(PgChatRepository::new(pool.clone())),
        transaction_manager: PgTransactionManager::new(pool.clone()),
    });
    let state = AppState::new(Arc::new(chat_service));
    let app = router(state, config.server.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
    tracing::info!(address = %listener.local_addr()?, "chat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("database pool closed, bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
