use std::sync::Arc;

use super::health::HealthCheckHandler;
use super::info_manager::InstanceInfoManager;
use super::instance_config::InstanceConfig;

/// 注册一个服务实例所需的全部信息
pub struct EurekaRegistration {
    instance_config: Box<dyn InstanceConfig>,
    application_info_manager: Arc<dyn InstanceInfoManager>,
    health_check_handler: Option<Arc<dyn HealthCheckHandler>>,
}

impl std::fmt::Debug for EurekaRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EurekaRegistration")
            .field("instance_config", &self.instance_config)
            .field("has_health_check_handler", &self.health_check_handler.is_some())
            .finish()
    }
}

impl EurekaRegistration {
    pub fn new(
        instance_config: Box<dyn InstanceConfig>,
        application_info_manager: Arc<dyn InstanceInfoManager>,
        health_check_handler: Option<Arc<dyn HealthCheckHandler>>,
    ) -> Self {
        Self {
            instance_config,
            application_info_manager,
            health_check_handler,
        }
    }

    pub fn instance_config(&self) -> &dyn InstanceConfig {
        self.instance_config.as_ref()
    }

    pub fn application_info_manager(&self) -> &Arc<dyn InstanceInfoManager> {
        &self.application_info_manager
    }

    pub fn health_check_handler(&self) -> Option<&Arc<dyn HealthCheckHandler>> {
        self.health_check_handler.as_ref()
    }

    pub fn set_health_check_handler(&mut self, handler: Option<Arc<dyn HealthCheckHandler>>) {
        self.health_check_handler = handler;
    }

    pub fn set_non_secure_port(&mut self, port: u16) {
        self.instance_config.set_non_secure_port(port);
    }

    pub fn non_secure_port(&self) -> u16 {
        self.instance_config.non_secure_port()
    }
}
