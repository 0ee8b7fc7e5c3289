//! # 管理端模块
//!
//! 提供商、API 路径、路由缓存与用量统计的 HTTP 管理接口

pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;
pub mod services;

pub use server::{AppState, ManagementServer, build_router};
