//! Registry module
//!
//! This module bridges the generic registration lifecycle to a discovery client:
//! - `types`: Instance status, instance snapshots and application lists
//! - `instance_config`: Instance configuration trait and its config-file backed implementation
//! - `info_manager`: Instance info manager trait and the in-process manager
//! - `health`: Health check handler capability and indicator aggregation
//! - `registration`: The registration descriptor handed to the registry
//! - `service`: The `ServiceRegistry` lifecycle and its eureka adapter
//! - `error`: Errors crossing the discovery boundary

pub mod error;
pub mod health;
pub mod info_manager;
pub mod instance_config;
pub mod registration;
pub mod service;
pub mod types;

// Re-export public types for easier access
pub use error::DiscoveryError;
pub use health::{EurekaHealthCheckHandler, HealthCheckHandler, HealthIndicator};
pub use info_manager::{
    ApplicationInfoManager, InstanceInfoManager, StatusChangeEvent, StatusChangeListener,
};
pub use instance_config::{EurekaInstanceConfig, InstanceConfig};
pub use registration::EurekaRegistration;
pub use service::{EurekaServiceRegistry, ServiceRegistry};
pub use types::{Application, Applications, InstanceInfo, InstanceStatus};
