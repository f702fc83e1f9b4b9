use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use super::instance_config::InstanceConfig;

// 实例在服务发现系统中的生命周期状态
//
// 反序列化走 `FromStr`，和环境变量覆盖一样宽松
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    #[default]
    Unknown,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 5] = [
        InstanceStatus::Up,
        InstanceStatus::Down,
        InstanceStatus::Starting,
        InstanceStatus::OutOfService,
        InstanceStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Up => "UP",
            InstanceStatus::Down => "DOWN",
            InstanceStatus::Starting => "STARTING",
            InstanceStatus::OutOfService => "OUT_OF_SERVICE",
            InstanceStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 宽松解析：无法识别的字符串一律视为 UNKNOWN
impl FromStr for InstanceStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_uppercase().as_str() {
            "UP" => InstanceStatus::Up,
            "DOWN" => InstanceStatus::Down,
            "STARTING" => InstanceStatus::Starting,
            "OUT_OF_SERVICE" => InstanceStatus::OutOfService,
            _ => InstanceStatus::Unknown,
        };
        Ok(status)
    }
}

impl From<String> for InstanceStatus {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(InstanceStatus::Unknown)
    }
}

/// 实例信息快照
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceInfo {
    pub instance_id: String,
    /// 应用名（统一大写）
    pub app_name: String,
    pub host_name: String,
    pub ip_addr: String,
    pub port: u16,
    pub secure_port: u16,
    pub status: InstanceStatus,
    pub metadata: HashMap<String, String>,
    pub last_updated: SystemTime,
}

impl InstanceInfo {
    /// 从实例配置构建快照，初始状态为 STARTING
    pub fn from_config(config: &dyn InstanceConfig) -> Self {
        Self {
            instance_id: config.instance_id(),
            app_name: config.app_name().to_ascii_uppercase(),
            host_name: config.hostname().to_string(),
            ip_addr: config.ip_address().to_string(),
            port: config.non_secure_port(),
            secure_port: config.secure_port(),
            status: InstanceStatus::Starting,
            metadata: config.metadata(),
            last_updated: SystemTime::now(),
        }
    }
}

// 某个应用下的全部实例
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Application {
    pub name: String,
    pub instances: Vec<InstanceInfo>,
}

impl Application {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            instances: Vec::new(),
        }
    }

    // 按 instance_id 新增或替换实例
    pub fn upsert(&mut self, info: InstanceInfo) {
        match self
            .instances
            .iter_mut()
            .find(|existing| existing.instance_id == info.instance_id)
        {
            Some(existing) => *existing = info,
            None => self.instances.push(info),
        }
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<InstanceInfo> {
        let idx = self
            .instances
            .iter()
            .position(|info| info.instance_id == instance_id)?;
        Some(self.instances.remove(idx))
    }

    pub fn instances_with_status(&self, status: InstanceStatus) -> Vec<&InstanceInfo> {
        self.instances
            .iter()
            .filter(|info| info.status == status)
            .collect()
    }
}

/// 客户端缓存的应用列表快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applications {
    apps: BTreeMap<String, Application>,
}

impl Applications {
    pub fn new(apps: impl IntoIterator<Item = Application>) -> Self {
        Self {
            apps: apps
                .into_iter()
                .map(|app| (app.name.clone(), app))
                .collect(),
        }
    }

    // 应用名不区分大小写
    pub fn get_registered_application(&self, name: &str) -> Option<&Application> {
        self.apps.get(&name.to_ascii_uppercase())
    }

    pub fn registered_applications(&self) -> impl Iterator<Item = &Application> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_form() {
        for status in InstanceStatus::ALL {
            assert_eq!(status.as_str().parse::<InstanceStatus>().unwrap(), status);
        }
        assert_eq!(InstanceStatus::OutOfService.to_string(), "OUT_OF_SERVICE");
    }

    #[test]
    fn test_status_parse_is_lenient() {
        assert_eq!("up".parse::<InstanceStatus>().unwrap(), InstanceStatus::Up);
        assert_eq!(
            "out_of_service".parse::<InstanceStatus>().unwrap(),
            InstanceStatus::OutOfService
        );
        assert_eq!(
            "sleeping".parse::<InstanceStatus>().unwrap(),
            InstanceStatus::Unknown
        );
    }

    #[test]
    fn test_status_deserialize_is_lenient() {
        #[derive(Deserialize)]
        struct Doc {
            status: InstanceStatus,
        }

        let doc: Doc = toml::from_str(r#"status = "out_of_service""#).unwrap();
        assert_eq!(doc.status, InstanceStatus::OutOfService);
        let doc: Doc = toml::from_str(r#"status = "SLEEPING""#).unwrap();
        assert_eq!(doc.status, InstanceStatus::Unknown);
    }

    #[test]
    fn test_application_upsert_replaces_by_id() {
        let mut app = Application::new("simple");
        assert_eq!(app.name, "SIMPLE");

        let info = InstanceInfo {
            instance_id: "localhost:simple:8080".to_string(),
            app_name: "SIMPLE".to_string(),
            host_name: "localhost".to_string(),
            ip_addr: "127.0.0.1".to_string(),
            port: 8080,
            secure_port: 443,
            status: InstanceStatus::Starting,
            metadata: HashMap::new(),
            last_updated: SystemTime::now(),
        };
        app.upsert(info.clone());
        app.upsert(InstanceInfo {
            status: InstanceStatus::Up,
            ..info
        });

        assert_eq!(app.instances.len(), 1);
        assert_eq!(app.instances_with_status(InstanceStatus::Up).len(), 1);
        assert!(app.remove("localhost:simple:8080").is_some());
        assert!(app.instances.is_empty());
    }

    #[test]
    fn test_applications_lookup_ignores_case() {
        let apps = Applications::new(vec![Application::new("simple")]);
        assert!(apps.get_registered_application("Simple").is_some());
        assert!(apps.get_registered_application("other").is_none());
        assert_eq!(apps.len(), 1);
    }
}
