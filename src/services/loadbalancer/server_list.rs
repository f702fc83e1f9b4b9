use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::error::LoadBalancerError;
use crate::services::discovery::DiscoveryClient;
use crate::services::registry::InstanceStatus;

/// 一个可路由的后端地址
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    // 解析 "host:port"
    pub fn parse(s: &str) -> Result<Self, LoadBalancerError> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| LoadBalancerError::InvalidServer(s.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| LoadBalancerError::InvalidServer(s.to_string()))?;
        if host.is_empty() {
            return Err(LoadBalancerError::InvalidServer(s.to_string()));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 某个逻辑服务名对应的候选后端
#[async_trait]
pub trait ServerList: fmt::Debug + Send + Sync {
    async fn servers(&self) -> Result<Vec<Server>, LoadBalancerError>;
}

/// 固定的后端列表
#[derive(Debug, Clone, Default)]
pub struct StaticServerList {
    servers: Vec<Server>,
}

impl StaticServerList {
    pub fn new(servers: Vec<Server>) -> Self {
        Self { servers }
    }

    /// 解析逗号分隔的 "host:port" 列表，空项忽略
    pub fn from_list_of_servers(list: &str) -> Result<Self, LoadBalancerError> {
        let servers = list
            .split(',')
            .filter(|item| !item.trim().is_empty())
            .map(Server::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(servers))
    }
}

#[async_trait]
impl ServerList for StaticServerList {
    async fn servers(&self) -> Result<Vec<Server>, LoadBalancerError> {
        Ok(self.servers.clone())
    }
}

/// 从发现客户端读取某个应用下状态为 UP 的实例
pub struct DiscoveryServerList {
    client: Arc<dyn DiscoveryClient>,
    app_name: String,
}

impl fmt::Debug for DiscoveryServerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryServerList")
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

impl DiscoveryServerList {
    pub fn new(client: Arc<dyn DiscoveryClient>, app_name: &str) -> Self {
        Self {
            client,
            app_name: app_name.to_string(),
        }
    }
}

#[async_trait]
impl ServerList for DiscoveryServerList {
    async fn servers(&self) -> Result<Vec<Server>, LoadBalancerError> {
        let applications = self.client.applications().await?;
        let servers: Vec<Server> = applications
            .get_registered_application(&self.app_name)
            .map(|app| {
                app.instances_with_status(InstanceStatus::Up)
                    .into_iter()
                    .map(|info| Server::new(&info.host_name, info.port))
                    .collect()
            })
            .unwrap_or_default();
        Ok(servers)
    }
}
