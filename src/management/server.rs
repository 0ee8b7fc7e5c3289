//! # 管理服务器
//!
//! Axum HTTP服务器，提供路由配置与用量统计的管理API

use std::future::Future;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app::AppContext;
use crate::config::ServerConfig;
use crate::error::{GatewayError, Result};
use crate::linfo;
use crate::logging::{LogComponent, LogStage};

/// API 前缀
pub const API_PREFIX: &str = "/api";

/// 管理服务器应用状态
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 管理服务器
pub struct ManagementServer {
    config: ServerConfig,
    router: Router,
}

impl ManagementServer {
    /// 创建新的管理服务器
    pub fn new(config: ServerConfig, context: Arc<AppContext>) -> Self {
        let router = build_router(AppState::new(context), config.enable_cors);
        Self { config, router }
    }

    /// 启动服务器，`shutdown` 完成后优雅退出
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let bind_address = self.config.bind_address();
        let addr: SocketAddr = bind_address.parse().map_err(|e| {
            GatewayError::config_with_source(format!("无效的监听地址: {bind_address}"), e)
        })?;

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::server_init_with_source(format!("无法绑定地址: {addr}"), e))?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::ServerSetup,
            "server_start",
            &format!("Starting management server on {addr}")
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::server_start_with_source("管理服务器运行失败", e))
    }
}

/// 组装完整路由，所有接口挂在 `/api` 下
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let app = Router::new().nest(API_PREFIX, super::routes::create_routes(state));

    let service_builder = ServiceBuilder::new().layer(TraceLayer::new_for_http());
    if enable_cors {
        let cors_layer = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
                axum::http::header::ORIGIN,
            ])
            .allow_origin(Any);
        app.layer(service_builder.layer(cors_layer))
    } else {
        app.layer(service_builder)
    }
}
