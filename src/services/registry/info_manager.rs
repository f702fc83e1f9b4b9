use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use super::error::DiscoveryError;
use super::instance_config::InstanceConfig;
use super::types::{InstanceInfo, InstanceStatus};

/// 维护实例当前状态并对外提供快照
pub trait InstanceInfoManager: Send + Sync {
    /// 尚未初始化时返回 `None`
    fn info(&self) -> Option<InstanceInfo>;

    fn set_instance_status(&self, status: InstanceStatus) -> Result<(), DiscoveryError>;
}

// 状态变化事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChangeEvent {
    pub previous: InstanceStatus,
    pub current: InstanceStatus,
}

pub type StatusChangeListener = Arc<dyn Fn(&InstanceInfo, StatusChangeEvent) + Send + Sync>;

/// 进程内的实例信息管理器
#[derive(Default)]
pub struct ApplicationInfoManager {
    info: RwLock<Option<InstanceInfo>>,
    listeners: DashMap<String, StatusChangeListener>,
}

impl std::fmt::Debug for ApplicationInfoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationInfoManager")
            .field("info", &self.info())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ApplicationInfoManager {
    /// 创建未初始化的管理器，`info()` 返回 `None` 直到调用 [`initialize`](Self::initialize)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &dyn InstanceConfig) -> Self {
        let manager = Self::new();
        manager.initialize(InstanceInfo::from_config(config));
        manager
    }

    // 重复调用会覆盖旧快照，不触发监听器
    pub fn initialize(&self, info: InstanceInfo) {
        tracing::debug!(
            instance_id = %info.instance_id,
            app_name = %info.app_name,
            "Initialized instance info"
        );
        *self.info.write().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    pub fn register_status_change_listener(&self, id: &str, listener: StatusChangeListener) {
        self.listeners.insert(id.to_string(), listener);
    }

    pub fn unregister_status_change_listener(&self, id: &str) -> bool {
        self.listeners.remove(id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl InstanceInfoManager for ApplicationInfoManager {
    fn info(&self) -> Option<InstanceInfo> {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_instance_status(&self, status: InstanceStatus) -> Result<(), DiscoveryError> {
        let (snapshot, event) = {
            let mut guard = self.info.write().unwrap_or_else(PoisonError::into_inner);
            let info = guard.as_mut().ok_or(DiscoveryError::NotInitialized)?;

            if info.status == status {
                return Ok(());
            }

            let event = StatusChangeEvent {
                previous: info.status,
                current: status,
            };
            info.status = status;
            info.last_updated = SystemTime::now();
            (info.clone(), event)
        };

        tracing::debug!(
            instance_id = %snapshot.instance_id,
            previous = %event.previous,
            current = %event.current,
            "Instance status changed"
        );

        // 在释放锁之后通知监听器，监听器内可以再次读取快照
        let listeners: Vec<StatusChangeListener> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for listener in listeners {
            listener(&snapshot, event);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::EurekaInstanceConfig;
    use std::sync::Mutex;

    #[test]
    fn test_uninitialized_manager() {
        let manager = ApplicationInfoManager::new();
        assert!(manager.info().is_none());
        assert!(matches!(
            manager.set_instance_status(InstanceStatus::Up),
            Err(DiscoveryError::NotInitialized)
        ));
    }

    #[test]
    fn test_from_config_starts_in_starting() {
        let config = EurekaInstanceConfig::new("simple");
        let manager = ApplicationInfoManager::from_config(&config);
        let info = manager.info().unwrap();
        assert_eq!(info.status, InstanceStatus::Starting);
        assert_eq!(info.app_name, "SIMPLE");
        assert_eq!(info.port, 8080);
    }

    #[test]
    fn test_listeners_only_see_real_changes() {
        let manager = ApplicationInfoManager::from_config(&EurekaInstanceConfig::new("simple"));
        let events = Arc::new(Mutex::new(Vec::new()));

        let sink = events.clone();
        manager.register_status_change_listener(
            "recorder",
            Arc::new(move |_info: &InstanceInfo, event: StatusChangeEvent| {
                sink.lock().unwrap().push(event);
            }),
        );

        manager.set_instance_status(InstanceStatus::Up).unwrap();
        manager.set_instance_status(InstanceStatus::Up).unwrap();
        manager.set_instance_status(InstanceStatus::Down).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StatusChangeEvent {
                previous: InstanceStatus::Starting,
                current: InstanceStatus::Up,
            }
        );
        assert_eq!(events[1].current, InstanceStatus::Down);
    }

    #[test]
    fn test_unregistered_listener_is_not_called() {
        let manager = ApplicationInfoManager::from_config(&EurekaInstanceConfig::new("simple"));
        let calls = Arc::new(Mutex::new(0));

        let counter = calls.clone();
        manager.register_status_change_listener(
            "counter",
            Arc::new(move |_info: &InstanceInfo, _event: StatusChangeEvent| {
                *counter.lock().unwrap() += 1;
            }),
        );
        assert_eq!(manager.listener_count(), 1);
        assert!(manager.unregister_status_change_listener("counter"));
        assert_eq!(manager.listener_count(), 0);

        manager.set_instance_status(InstanceStatus::Up).unwrap();
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
