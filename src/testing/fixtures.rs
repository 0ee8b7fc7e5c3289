//! # 测试数据 Fixtures

use crate::routing::{ProviderSnapshot, RouteEntry};

/// 路由条目构建器
#[derive(Debug, Clone)]
pub struct RouteFixture {
    entry: RouteEntry,
}

impl Default for RouteFixture {
    fn default() -> Self {
        Self {
            entry: RouteEntry {
                id: 1,
                path: "/api/echo".to_string(),
                access_key: "client-key".to_string(),
                system_prompt: None,
                provider_id: 1,
                stream_output: false,
                provider: ProviderSnapshot {
                    id: 1,
                    name: "openai".to_string(),
                    base_url: "https://api.openai.com".to_string(),
                    api_key: "sk-test".to_string(),
                    model_name: "gpt-4o".to_string(),
                },
            },
        }
    }
}

impl RouteFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i32) -> Self {
        self.entry.id = id;
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.entry.path = path.to_string();
        self
    }

    /// 绑定到指定提供商，快照字段随之变化
    pub fn provider(mut self, id: i32, name: &str) -> Self {
        self.entry.provider_id = id;
        self.entry.provider.id = id;
        self.entry.provider.name = name.to_string();
        self
    }

    pub fn streaming(mut self) -> Self {
        self.entry.stream_output = true;
        self
    }

    pub fn system_prompt(mut self, prompt: &str) -> Self {
        self.entry.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn build(self) -> RouteEntry {
        self.entry
    }
}
