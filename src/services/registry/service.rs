use async_trait::async_trait;
use std::sync::Arc;

use super::error::DiscoveryError;
use super::registration::EurekaRegistration;
use super::types::InstanceStatus;
use crate::services::discovery::DiscoveryClient;

/// 通用的注册生命周期
#[async_trait]
pub trait ServiceRegistry<R: Sync>: Send + Sync {
    type Error;

    async fn register(&self, registration: &R) -> Result<(), Self::Error>;

    async fn deregister(&self, registration: &R) -> Result<(), Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;
}

/// 把注册生命周期转发给发现客户端
///
/// 不做加锁、重试或回滚：底层返回的错误原样交给调用方。
/// `close` 之后再调用 `register`/`deregister`，或重复 `close`，
/// 行为完全取决于底层客户端。
#[derive(Clone)]
pub struct EurekaServiceRegistry {
    eureka_client: Arc<dyn DiscoveryClient>,
}

impl std::fmt::Debug for EurekaServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EurekaServiceRegistry").finish_non_exhaustive()
    }
}

impl EurekaServiceRegistry {
    pub fn new(eureka_client: Arc<dyn DiscoveryClient>) -> Self {
        Self { eureka_client }
    }

    pub fn eureka_client(&self) -> &Arc<dyn DiscoveryClient> {
        &self.eureka_client
    }

    // 强制初始化可能延迟创建的依赖，返回值不使用
    async fn maybe_initialize_client(
        &self,
        reg: &EurekaRegistration,
    ) -> Result<(), DiscoveryError> {
        let _ = reg.application_info_manager().info();
        let _ = self.eureka_client.applications().await?;
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry<EurekaRegistration> for EurekaServiceRegistry {
    type Error = DiscoveryError;

    async fn register(&self, reg: &EurekaRegistration) -> Result<(), DiscoveryError> {
        self.maybe_initialize_client(reg).await?;

        let config = reg.instance_config();
        tracing::info!(
            app_name = %config.app_name(),
            status = %config.initial_status(),
            "Registering application with eureka"
        );

        reg.application_info_manager()
            .set_instance_status(config.initial_status())?;

        if let Some(handler) = reg.health_check_handler() {
            self.eureka_client.register_health_check(handler.clone())?;
        }

        Ok(())
    }

    async fn deregister(&self, reg: &EurekaRegistration) -> Result<(), DiscoveryError> {
        // 从未初始化过的实例无需处理
        if reg.application_info_manager().info().is_none() {
            return Ok(());
        }

        tracing::info!(
            app_name = %reg.instance_config().app_name(),
            status = %InstanceStatus::Down,
            "Unregistering application with eureka"
        );

        reg.application_info_manager()
            .set_instance_status(InstanceStatus::Down)
    }

    async fn close(&self) -> Result<(), DiscoveryError> {
        self.eureka_client.shutdown().await
    }
}
