use dashmap::DashMap;
use reqwest::{Method, RequestBuilder, Response};
use std::sync::Arc;

use super::balancer::LoadBalancer;
use super::error::LoadBalancerError;
use super::extractor::extract_service_name;
use super::server_list::{DiscoveryServerList, ServerList};
use crate::services::discovery::DiscoveryClient;

/// 按逻辑服务名路由的 HTTP 客户端
///
/// `http://simple/path` 中的 `simple` 被当作服务名，
/// 由对应的 [`LoadBalancer`] 选出实际地址后改写 URL 再发送。
#[derive(Clone)]
pub struct LoadBalancedClient {
    http: reqwest::Client,
    balancers: Arc<DashMap<String, LoadBalancer>>,
    discovery: Option<Arc<dyn DiscoveryClient>>,
}

impl std::fmt::Debug for LoadBalancedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.balancers.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("LoadBalancedClient")
            .field("balancers", &names)
            .field("discovery", &self.discovery.is_some())
            .finish()
    }
}

impl LoadBalancedClient {
    pub fn builder() -> LoadBalancedClientBuilder {
        LoadBalancedClientBuilder::new()
    }

    // 未静态配置的服务名交给发现客户端解析
    fn balancer_for(&self, name: &str) -> Result<LoadBalancer, LoadBalancerError> {
        let key = name.to_ascii_lowercase();
        if let Some(balancer) = self.balancers.get(&key) {
            return Ok(balancer.clone());
        }

        let client = self
            .discovery
            .clone()
            .ok_or_else(|| LoadBalancerError::NoInstancesAvailable(name.to_string()))?;

        let balancer = self
            .balancers
            .entry(key)
            .or_insert_with(|| {
                tracing::info!(client = %name, "Creating discovery backed load balancer");
                LoadBalancer::new(name, Arc::new(DiscoveryServerList::new(client, name)))
            })
            .clone();
        Ok(balancer)
    }

    /// 解析服务名并改写 URL，返回可继续设置请求头、请求体的构建器
    pub async fn request(
        &self,
        method: Method,
        url: &str,
    ) -> Result<RequestBuilder, LoadBalancerError> {
        let (mut target, name) = extract_service_name(url)?;
        let server = self.balancer_for(&name)?.choose().await?;

        target
            .set_host(Some(&server.host))
            .map_err(|e| LoadBalancerError::InvalidUrl(format!("{}: {e}", server.host)))?;
        target
            .set_port(Some(server.port))
            .map_err(|_| LoadBalancerError::InvalidUrl(target.to_string()))?;

        tracing::debug!(
            client = %name,
            original = %url,
            target = %target,
            "Rewrote load balanced request"
        );

        Ok(self.http.request(method, target))
    }

    pub async fn get(&self, url: &str) -> Result<Response, LoadBalancerError> {
        Ok(self.request(Method::GET, url).await?.send().await?)
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<String>,
    ) -> Result<Response, LoadBalancerError> {
        Ok(self
            .request(Method::POST, url)
            .await?
            .body(body.into())
            .send()
            .await?)
    }
}

#[derive(Default)]
pub struct LoadBalancedClientBuilder {
    http: Option<reqwest::Client>,
    server_lists: Vec<(String, Arc<dyn ServerList>)>,
    discovery: Option<Arc<dyn DiscoveryClient>>,
}

impl LoadBalancedClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// 为逻辑服务名指定后端列表
    pub fn server_list(mut self, name: &str, list: Arc<dyn ServerList>) -> Self {
        self.server_lists.push((name.to_ascii_lowercase(), list));
        self
    }

    pub fn discovery_client(mut self, client: Arc<dyn DiscoveryClient>) -> Self {
        self.discovery = Some(client);
        self
    }

    pub fn build(self) -> LoadBalancedClient {
        let balancers = DashMap::new();
        for (name, list) in self.server_lists {
            balancers.insert(name.clone(), LoadBalancer::new(&name, list));
        }

        LoadBalancedClient {
            http: self.http.unwrap_or_default(),
            balancers: Arc::new(balancers),
            discovery: self.discovery,
        }
    }
}
