use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::DiscoveryClient;
use crate::services::registry::{
    Application, ApplicationInfoManager, Applications, DiscoveryError, HealthCheckHandler,
    InstanceInfo, InstanceInfoManager, StatusChangeEvent,
};

// 应用表（应用名大写 -> 应用）
type ApplicationTable = Arc<DashMap<String, Application>>;

/// 进程内的发现客户端
///
/// 订阅 [`ApplicationInfoManager`] 的状态变化，把本实例写入应用表；
/// 其他实例可以通过 [`add_instance`](Self::add_instance) 直接写入。
/// 不包含心跳、续约和剔除逻辑。
pub struct LocalDiscoveryClient {
    info_manager: Arc<ApplicationInfoManager>,
    applications: ApplicationTable,
    health_check: RwLock<Option<Arc<dyn HealthCheckHandler>>>,
    shut_down: AtomicBool,
    listener_id: String,
}

impl std::fmt::Debug for LocalDiscoveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDiscoveryClient")
            .field("applications", &self.applications.len())
            .field("shut_down", &self.shut_down.load(Ordering::Acquire))
            .field("listener_id", &self.listener_id)
            .finish()
    }
}

impl LocalDiscoveryClient {
    pub fn new(info_manager: Arc<ApplicationInfoManager>) -> Self {
        let applications: ApplicationTable = Arc::new(DashMap::new());
        let listener_id = format!("local-discovery-{}", Uuid::new_v4());

        // 已初始化的实例立即写入应用表
        if let Some(info) = info_manager.info() {
            Self::upsert(&applications, info);
        }

        let table = applications.clone();
        info_manager.register_status_change_listener(
            &listener_id,
            Arc::new(move |info: &InstanceInfo, event: StatusChangeEvent| {
                tracing::info!(
                    app_name = %info.app_name,
                    instance_id = %info.instance_id,
                    previous = %event.previous,
                    current = %event.current,
                    "Publishing instance status change"
                );
                Self::upsert(&table, info.clone());
            }),
        );

        Self {
            info_manager,
            applications,
            health_check: RwLock::new(None),
            shut_down: AtomicBool::new(false),
            listener_id,
        }
    }

    fn upsert(table: &ApplicationTable, info: InstanceInfo) {
        table
            .entry(info.app_name.clone())
            .or_insert_with(|| Application::new(&info.app_name))
            .upsert(info);
    }

    fn ensure_running(&self) -> Result<(), DiscoveryError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(DiscoveryError::ShutDown);
        }
        Ok(())
    }

    /// 写入其他实例（例如静态配置的对端）
    pub fn add_instance(&self, info: InstanceInfo) -> Result<(), DiscoveryError> {
        self.ensure_running()?;
        tracing::debug!(
            app_name = %info.app_name,
            instance_id = %info.instance_id,
            status = %info.status,
            "Adding instance to local application table"
        );
        Self::upsert(&self.applications, info);
        Ok(())
    }

    pub fn remove_instance(&self, app_name: &str, instance_id: &str) -> Option<InstanceInfo> {
        let key = app_name.to_ascii_uppercase();
        let removed = self
            .applications
            .get_mut(&key)
            .and_then(|mut app| app.remove(instance_id));
        self.applications.remove_if(&key, |_, app| app.instances.is_empty());
        removed
    }

    /// 用健康检查处理器的结果刷新本实例状态
    pub fn refresh_instance_info(&self) -> Result<(), DiscoveryError> {
        self.ensure_running()?;

        let handler = self
            .health_check
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let (Some(handler), Some(info)) = (handler, self.info_manager.info()) else {
            return Ok(());
        };

        let status = handler.status(info.status);
        self.info_manager.set_instance_status(status)
    }

    /// 按固定间隔调用 [`refresh_instance_info`](Self::refresh_instance_info)
    ///
    /// 只持有弱引用，客户端关闭或被释放后任务在下一次触发时退出。
    pub fn spawn_refresh_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        // interval 不接受零间隔
        let period = period.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(client) = weak.upgrade() else {
                    break;
                };
                if client.is_shut_down() {
                    break;
                }
                if let Err(e) = client.refresh_instance_info() {
                    tracing::warn!(error = %e, "Failed to refresh instance info");
                }
            }
            tracing::debug!("Instance info refresh task stopped");
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

// 未经 shutdown 直接释放时也要摘掉监听器，否则管理器会一直持有它
impl Drop for LocalDiscoveryClient {
    fn drop(&mut self) {
        self.info_manager
            .unregister_status_change_listener(&self.listener_id);
    }
}

#[async_trait]
impl DiscoveryClient for LocalDiscoveryClient {
    async fn applications(&self) -> Result<Applications, DiscoveryError> {
        self.ensure_running()?;
        Ok(Applications::new(
            self.applications.iter().map(|entry| entry.value().clone()),
        ))
    }

    fn register_health_check(
        &self,
        handler: Arc<dyn HealthCheckHandler>,
    ) -> Result<(), DiscoveryError> {
        self.ensure_running()?;
        let mut guard = self
            .health_check
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            tracing::warn!("Replacing previously registered health check handler");
        }
        *guard = Some(handler);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), DiscoveryError> {
        // 重复关闭直接返回
        if self.shut_down.swap(true, Ordering::AcqRel) {
            tracing::debug!("Discovery client already shut down");
            return Ok(());
        }

        tracing::info!("Shutting down local discovery client");
        self.info_manager
            .unregister_status_change_listener(&self.listener_id);
        self.health_check
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(info) = self.info_manager.info() {
            if self
                .remove_instance(&info.app_name, &info.instance_id)
                .is_some()
            {
                tracing::info!(
                    app_name = %info.app_name,
                    instance_id = %info.instance_id,
                    "Unregistered instance from local application table"
                );
            }
        }

        Ok(())
    }
}
