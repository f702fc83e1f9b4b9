pub mod discovery;
pub mod loadbalancer;
pub mod registry;

pub use discovery::{DiscoveryClient, LocalDiscoveryClient};
pub use loadbalancer::{LoadBalancedClient, LoadBalancerError};
pub use registry::{EurekaRegistration, EurekaServiceRegistry, InstanceStatus, ServiceRegistry};
