//! # 数据库模块
//!
//! 数据库连接和迁移管理

use crate::config::DatabaseConfig;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let shown_url: String = if config.is_sqlite() {
        config.url.chars().take(50).collect()
    } else {
        "***".to_string()
    };
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect",
        &format!("正在连接数据库: {shown_url}")
    );

    config.ensure_database_path()?;

    let db = Database::connect(config.connect_options())
        .await
        .map_err(|e| GatewayError::database_with_source("数据库连接失败", e))?;

    linfo!("system", LogStage::Startup, LogComponent::Database, "connected", "数据库连接成功");
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    linfo!("system", LogStage::Startup, LogComponent::Database, "migrate", "开始运行数据库迁移...");

    match ::migration::Migrator::up(db, None).await {
        Ok(()) => {
            linfo!("system", LogStage::Startup, LogComponent::Database, "migrate", "数据库迁移完成");
            Ok(())
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migrate",
                &format!("数据库迁移失败: {e}")
            );
            Err(GatewayError::database_with_source("数据库迁移失败", e))
        }
    }
}

/// 检查数据库状态，返回待应用的迁移数
pub async fn check_database_status(db: &DatabaseConnection) -> Result<usize> {
    let pending = ::migration::Migrator::get_pending_migrations(db).await?;

    if pending.is_empty() {
        ldebug!("system", LogStage::Db, LogComponent::Database, "status", "所有迁移都已应用");
    } else {
        lwarn!(
            "system",
            LogStage::Db,
            LogComponent::Database,
            "status",
            &format!("有 {} 个待应用的迁移", pending.len())
        );
    }

    Ok(pending.len())
}
