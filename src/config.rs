use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use thiserror::Error;

use crate::services::discovery::DiscoveryClient;
use crate::services::loadbalancer::{
    LoadBalancedClient, LoadBalancerError, ServerList, StaticServerList,
};
use crate::services::registry::{EurekaInstanceConfig, InstanceStatus};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "EUREKA_CONFIG";
const INSTANCE_ENV_PREFIX: &str = "EUREKA_INSTANCE_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instance: EurekaInstanceConfig,
    pub client: ClientConfig,
    /// 逻辑服务名 -> 静态后端列表
    pub ribbon: HashMap<String, RibbonClientConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub register_with_eureka: bool,
    /// 开启后按 `instance_info_replication_interval_secs` 周期性用健康检查结果刷新实例状态
    pub healthcheck_enabled: bool,
    pub instance_info_replication_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            register_with_eureka: true,
            healthcheck_enabled: false,
            instance_info_replication_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RibbonClientConfig {
    /// 逗号分隔的 "host:port"
    pub list_of_servers: String,
}

// 环境变量覆盖项，例如 EUREKA_INSTANCE_NON_SECURE_PORT=0
#[derive(Debug, Default, Deserialize)]
struct InstanceOverrides {
    app_name: Option<String>,
    hostname: Option<String>,
    non_secure_port: Option<u16>,
    initial_status: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid environment override: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid server list for '{name}': {source}")]
    InvalidServerList {
        name: String,
        source: LoadBalancerError,
    },
}

impl Config {
    /// 加载顺序：`.env` -> 配置文件 -> `EUREKA_INSTANCE_*` 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = match fs::read_to_string(&path) {
            Ok(config_str) => Self::from_toml(&config_str)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path, "Config file not found, using defaults");
                Self::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let overrides: InstanceOverrides = envy::prefixed(INSTANCE_ENV_PREFIX).from_env()?;
        config.apply_overrides(overrides);

        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    fn apply_overrides(&mut self, overrides: InstanceOverrides) {
        if let Some(app_name) = overrides.app_name {
            self.instance.app_name = app_name;
        }
        if let Some(hostname) = overrides.hostname {
            self.instance.hostname = hostname;
        }
        if let Some(port) = overrides.non_secure_port {
            self.instance.non_secure_port = port;
        }
        if let Some(status) = overrides.initial_status {
            // FromStr 不会失败，无法识别时为 UNKNOWN
            self.instance.initial_status = status
                .parse::<InstanceStatus>()
                .unwrap_or(InstanceStatus::Unknown);
        }
    }

    /// 构建配置中声明的静态后端列表
    pub fn server_lists(&self) -> Result<Vec<(String, Arc<dyn ServerList>)>, ConfigError> {
        self.ribbon
            .iter()
            .map(|(name, ribbon)| {
                let list = StaticServerList::from_list_of_servers(&ribbon.list_of_servers)
                    .map_err(|source| ConfigError::InvalidServerList {
                        name: name.clone(),
                        source,
                    })?;
                Ok((name.clone(), Arc::new(list) as Arc<dyn ServerList>))
            })
            .collect()
    }

    /// 用静态后端列表构建负载均衡客户端，未配置的服务名交给发现客户端
    pub fn load_balanced_client(
        &self,
        discovery: Option<Arc<dyn DiscoveryClient>>,
    ) -> Result<LoadBalancedClient, ConfigError> {
        let mut builder = LoadBalancedClient::builder();
        for (name, list) in self.server_lists()? {
            builder = builder.server_list(&name, list);
        }
        if let Some(client) = discovery {
            builder = builder.discovery_client(client);
        }
        Ok(builder.build())
    }
}
