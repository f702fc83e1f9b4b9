//! Discovery client boundary
//!
//! - `DiscoveryClient`: the narrow surface the registry adapter and the
//!   load balancer consume
//! - `local`: an in-process client backed by an application table

pub mod local;

use async_trait::async_trait;
use std::sync::Arc;

use crate::services::registry::{Applications, DiscoveryError, HealthCheckHandler};

pub use local::LocalDiscoveryClient;

/// 服务发现客户端
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// 返回客户端缓存的应用列表（必要时触发初始化）
    async fn applications(&self) -> Result<Applications, DiscoveryError>;

    /// 注册健康检查处理器，后注册的覆盖先注册的
    fn register_health_check(
        &self,
        handler: Arc<dyn HealthCheckHandler>,
    ) -> Result<(), DiscoveryError>;

    /// 关闭客户端并释放资源
    async fn shutdown(&self) -> Result<(), DiscoveryError>;
}
