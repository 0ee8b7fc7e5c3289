//! # AI Gateway 主程序
//!
//! 启动顺序：日志 → 配置 → 数据库与迁移 → 路由表预热 → 当日统计加载 → 统计落库任务 → 管理服务

use std::sync::Arc;

use ai_gateway::{
    AppContext, UsageSyncTask,
    config::ConfigManager,
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
    management::ManagementServer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init_optimized_logging(None);

    if let Err(e) = run().await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config_manager =
        ConfigManager::new().map_err(|e| anyhow::anyhow!("配置管理器初始化失败: {e}"))?;
    let config = config_manager.get_config();

    // 路由表或当日统计加载失败时不对外服务
    let context = Arc::new(
        AppContext::bootstrap(config.clone())
            .await
            .map_err(|e| anyhow::anyhow!("应用初始化失败: {e}"))?,
    );

    let sync_task = UsageSyncTask::from_config(Arc::clone(&context.usage), &config.usage);
    sync_task.start().await;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        bind = %config.server.bind_address()
    );

    let server = ManagementServer::new(config.server.clone(), Arc::clone(&context));
    let served = server.serve(shutdown_signal()).await;

    // 无论服务如何退出都停止后台任务，必要时做最后一次落库
    if let Some(report) = sync_task.stop().await {
        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::Main,
            "final_flush",
            "退出前统计落库完成",
            written = report.written,
            failed = report.failed,
            retired_pending = report.retired_pending
        );
    }

    served.map_err(|e| anyhow::anyhow!("管理服务异常退出: {e}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::Main,
            "signal_listen_failed",
            &format!("无法监听退出信号: {e}")
        );
        std::future::pending::<()>().await;
    }
    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "shutdown_signal",
        "收到退出信号，开始关闭"
    );
}
