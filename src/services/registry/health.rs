use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

use super::types::InstanceStatus;

/// 由发现客户端调用，用于判断实例当前的健康状态
pub trait HealthCheckHandler: Send + Sync {
    fn status(&self, current: InstanceStatus) -> InstanceStatus;
}

/// 单项健康指标
pub trait HealthIndicator: Send + Sync {
    fn health(&self) -> InstanceStatus;
}

impl<F> HealthIndicator for F
where
    F: Fn() -> InstanceStatus + Send + Sync,
{
    fn health(&self) -> InstanceStatus {
        self()
    }
}

// 聚合优先级：DOWN > OUT_OF_SERVICE > UP > UNKNOWN
fn severity(status: InstanceStatus) -> u8 {
    match status {
        InstanceStatus::Down => 4,
        InstanceStatus::OutOfService => 3,
        InstanceStatus::Up => 2,
        InstanceStatus::Starting => 1,
        InstanceStatus::Unknown => 0,
    }
}

/// 聚合多个健康指标的处理器
#[derive(Default)]
pub struct EurekaHealthCheckHandler {
    indicators: RwLock<Vec<(String, Arc<dyn HealthIndicator>)>>,
}

impl Debug for EurekaHealthCheckHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .indicators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        f.debug_struct("EurekaHealthCheckHandler")
            .field("indicators", &names)
            .finish()
    }
}

impl EurekaHealthCheckHandler {
    pub fn new() -> Self {
        Self::default()
    }

    // 同名指标会被替换
    pub fn add_indicator(&self, name: &str, indicator: Arc<dyn HealthIndicator>) {
        let mut indicators = self
            .indicators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        indicators.retain(|(existing, _)| existing != name);
        indicators.push((name.to_string(), indicator));
    }

    pub fn remove_indicator(&self, name: &str) -> bool {
        let mut indicators = self
            .indicators
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = indicators.len();
        indicators.retain(|(existing, _)| existing != name);
        indicators.len() != before
    }
}

impl HealthCheckHandler for EurekaHealthCheckHandler {
    fn status(&self, current: InstanceStatus) -> InstanceStatus {
        let indicators = self
            .indicators
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let aggregated = indicators
            .iter()
            .map(|(name, indicator)| {
                let health = indicator.health();
                tracing::debug!(indicator = %name, health = %health, "Evaluated health indicator");
                health
            })
            .max_by_key(|status| severity(*status));

        aggregated.unwrap_or(current)
    }
}
