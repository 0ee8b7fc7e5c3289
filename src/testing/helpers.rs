//! # 测试辅助函数

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::sync::Once;
use tracing::Level;

static INIT: Once = Once::new();

/// 初始化测试日志
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 创建已迁移的内存数据库连接
pub async fn create_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// 断言错误类型
#[macro_export]
macro_rules! assert_error_type {
    ($result:expr, $error_type:pat) => {
        match $result {
            Err($error_type) => (),
            Err(other) => panic!("Expected error type, got: {:?}", other),
            Ok(val) => panic!("Expected error, got Ok: {:?}", val),
        }
    };
}
