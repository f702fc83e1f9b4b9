pub mod balancer;
pub mod client;
pub mod error;
pub mod extractor;
pub mod server_list;

pub use balancer::LoadBalancer;
pub use client::{LoadBalancedClient, LoadBalancedClientBuilder};
pub use error::LoadBalancerError;
pub use server_list::{DiscoveryServerList, Server, ServerList, StaticServerList};
