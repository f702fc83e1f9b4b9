use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::LoadBalancerError;
use super::server_list::{Server, ServerList};

/// 单个逻辑服务名的轮询负载均衡器
#[derive(Clone)]
pub struct LoadBalancer {
    name: String,
    server_list: Arc<dyn ServerList>,
    cursor: Arc<AtomicUsize>,
}

impl std::fmt::Debug for LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancer")
            .field("name", &self.name)
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl LoadBalancer {
    pub fn new(name: &str, server_list: Arc<dyn ServerList>) -> Self {
        Self {
            name: name.to_string(),
            server_list,
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // 每次选择都重新读取列表，列表变化立即生效
    pub async fn choose(&self) -> Result<Server, LoadBalancerError> {
        let servers = self.server_list.servers().await?;
        if servers.is_empty() {
            return Err(LoadBalancerError::NoInstancesAvailable(self.name.clone()));
        }

        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        let server = servers[idx % servers.len()].clone();
        tracing::debug!(client = %self.name, server = %server, "Chose server");
        Ok(server)
    }
}
