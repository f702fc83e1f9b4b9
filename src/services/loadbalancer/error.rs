use thiserror::Error;

use crate::services::registry::DiscoveryError;

// 定义负载均衡错误类型
#[derive(Error, Debug)]
pub enum LoadBalancerError {
    #[error("Invalid url: {0}")]
    InvalidUrl(String),

    #[error("Invalid hostname in url: {0}")]
    InvalidHostname(String),

    #[error("Invalid server '{0}', expected host:port")]
    InvalidServer(String),

    #[error("No instances available for {0}")]
    NoInstancesAvailable(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
