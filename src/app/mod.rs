//! # 应用装配模块
//!
//! 负责把数据库、路由缓存与用量聚合器组装为共享的应用上下文

pub mod context;

pub use context::AppContext;
