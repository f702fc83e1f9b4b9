use thiserror::Error;

/// 服务发现边界上的错误类型
///
/// 注册适配器不会包装或吞掉这些错误，原样返回给调用方。
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Discovery client has been shut down")]
    ShutDown,

    #[error("Instance info has not been initialized")]
    NotInitialized,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}
