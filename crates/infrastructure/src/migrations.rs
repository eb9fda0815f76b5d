use sqlx::migrate::Migrator;

/// 仓库根目录 `migrations/` 下的建表脚本，供集成测试初始化数据库使用
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
