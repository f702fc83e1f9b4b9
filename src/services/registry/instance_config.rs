use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

use super::types::InstanceStatus;

/// 注册一个实例所需的配置
///
/// 只有名称、端口和初始状态是必须实现的，其余字段给出默认值。
pub trait InstanceConfig: Debug + Send + Sync {
    fn app_name(&self) -> &str;

    fn initial_status(&self) -> InstanceStatus;

    fn non_secure_port(&self) -> u16;

    /// 直接写入，不做端口可用性校验
    fn set_non_secure_port(&mut self, port: u16);

    fn hostname(&self) -> &str {
        "localhost"
    }

    fn ip_address(&self) -> &str {
        "127.0.0.1"
    }

    fn secure_port(&self) -> u16 {
        443
    }

    fn instance_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.hostname(),
            self.app_name(),
            self.non_secure_port()
        )
    }

    fn metadata(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// 可从配置文件加载的实例配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EurekaInstanceConfig {
    pub app_name: String,
    pub hostname: String,
    pub ip_address: String,
    /// 为空时由 `host:app:port` 生成
    pub instance_id: Option<String>,
    /// 0 表示启动时绑定随机端口
    pub non_secure_port: u16,
    pub secure_port: u16,
    pub secure_port_enabled: bool,
    pub initial_status: InstanceStatus,
    pub metadata: HashMap<String, String>,
}

impl Default for EurekaInstanceConfig {
    fn default() -> Self {
        Self {
            app_name: "unknown".to_string(),
            hostname: "localhost".to_string(),
            ip_address: "127.0.0.1".to_string(),
            instance_id: None,
            non_secure_port: 8080,
            secure_port: 443,
            secure_port_enabled: false,
            initial_status: InstanceStatus::Up,
            metadata: HashMap::new(),
        }
    }
}

impl EurekaInstanceConfig {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_initial_status(mut self, status: InstanceStatus) -> Self {
        self.initial_status = status;
        self
    }

    pub fn with_non_secure_port(mut self, port: u16) -> Self {
        self.non_secure_port = port;
        self
    }
}

impl InstanceConfig for EurekaInstanceConfig {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn initial_status(&self) -> InstanceStatus {
        self.initial_status
    }

    fn non_secure_port(&self) -> u16 {
        self.non_secure_port
    }

    fn set_non_secure_port(&mut self, port: u16) {
        self.non_secure_port = port;
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn ip_address(&self) -> &str {
        &self.ip_address
    }

    fn secure_port(&self) -> u16 {
        self.secure_port
    }

    fn instance_id(&self) -> String {
        match &self.instance_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!(
                "{}:{}:{}",
                self.hostname, self.app_name, self.non_secure_port
            ),
        }
    }

    fn metadata(&self) -> HashMap<String, String> {
        self.metadata.clone()
    }
}
