use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tokio::net::TcpListener;

use eureka_registry::config::Config;
use eureka_registry::server;
use eureka_registry::services::discovery::LocalDiscoveryClient;
use eureka_registry::services::loadbalancer::{
    LoadBalancedClient, LoadBalancerError, Server, StaticServerList,
};
use eureka_registry::services::registry::{
    ApplicationInfoManager, EurekaInstanceConfig, EurekaRegistration, EurekaServiceRegistry,
    InstanceInfo, ServiceRegistry,
};

// 在随机端口上启动示例服务，返回端口
async fn spawn_instance(info_manager: Arc<ApplicationInfoManager>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind instance listener");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, server::router(info_manager)).await {
            eprintln!("instance server error: {err}");
        }
    });

    port
}

async fn simple_client() -> LoadBalancedClient {
    let port = spawn_instance(Arc::new(ApplicationInfoManager::new())).await;
    LoadBalancedClient::builder()
        .server_list(
            "simple",
            Arc::new(StaticServerList::new(vec![Server::new("127.0.0.1", port)])),
        )
        .build()
}

async fn assert_body(response: reqwest::Response, expected: &str) {
    assert_eq!(response.status(), StatusCode::OK, "wrong response code");
    assert_eq!(response.text().await.unwrap(), expected, "wrong response body");
}

#[tokio::test]
async fn test_vanilla_request_works() {
    let client = simple_client().await;
    let response = client.get("http://simple/").await.unwrap();
    assert_body(response, "hello").await;
}

#[tokio::test]
async fn test_request_with_path_param_works() {
    let client = simple_client().await;
    let response = client.get("http://simple/path/world").await.unwrap();
    assert_body(response, "hello world").await;
}

#[tokio::test]
async fn test_request_with_encoded_path_param_works() {
    let client = simple_client().await;
    let response = client
        .get("http://simple/path/world%20%26%20everyone%20else")
        .await
        .unwrap();
    assert_body(response, "hello world & everyone else").await;
}

#[tokio::test]
async fn test_request_with_request_param_works() {
    let client = simple_client().await;
    let response = client.get("http://simple/request?param=world").await.unwrap();
    assert_body(response, "hello world").await;
}

#[tokio::test]
async fn test_request_with_post_works() {
    let client = simple_client().await;
    let response = client.post("http://simple/post", "world").await.unwrap();
    assert_body(response, "hello world").await;
}

#[tokio::test]
async fn test_request_with_empty_post_works() {
    let client = simple_client().await;
    let response = client.post("http://simple/emptypost", "").await.unwrap();
    assert_body(response, "hello empty").await;
}

#[tokio::test]
async fn test_request_with_header_works() {
    let client = simple_client().await;
    let response = client
        .request(Method::GET, "http://simple/header")
        .await
        .unwrap()
        .header("X-Param", "world")
        .send()
        .await
        .unwrap();
    assert_body(response, "hello world").await;
}

#[tokio::test]
async fn test_invalid_hostname_error() {
    let client = simple_client().await;
    let err = client.get("https://simple_bad").await.unwrap_err();
    assert!(matches!(err, LoadBalancerError::InvalidHostname(_)));
    assert!(err.to_string().contains("Invalid hostname"));
}

#[tokio::test]
async fn test_client_from_config() {
    let port = spawn_instance(Arc::new(ApplicationInfoManager::new())).await;
    let config = Config::from_toml(&format!(
        r#"
        [ribbon.simple]
        list_of_servers = "127.0.0.1:{port}"
        "#
    ))
    .unwrap();

    let client = config.load_balanced_client(None).unwrap();
    let response = client.get("http://simple/path/config").await.unwrap();
    assert_body(response, "hello config").await;
}

#[tokio::test]
async fn test_registered_instance_is_resolved_through_discovery() {
    let info_manager = Arc::new(ApplicationInfoManager::new());
    let port = spawn_instance(info_manager.clone()).await;

    let instance_config = EurekaInstanceConfig {
        hostname: "127.0.0.1".to_string(),
        ..EurekaInstanceConfig::new("simple")
    };
    let mut registration = EurekaRegistration::new(
        Box::new(instance_config),
        info_manager.clone(),
        None,
    );
    registration.set_non_secure_port(port);
    info_manager.initialize(InstanceInfo::from_config(registration.instance_config()));

    let discovery = Arc::new(LocalDiscoveryClient::new(info_manager.clone()));
    let registry = EurekaServiceRegistry::new(discovery.clone());
    let client = LoadBalancedClient::builder()
        .discovery_client(discovery.clone())
        .build();

    // 注册前实例为 STARTING，不可路由
    let err = client.get("http://simple/").await.unwrap_err();
    assert!(matches!(err, LoadBalancerError::NoInstancesAvailable(_)));

    registry.register(&registration).await.unwrap();
    let response = client.get("http://simple/").await.unwrap();
    assert_body(response, "hello").await;

    let response = client.get("http://simple/health").await.unwrap();
    assert_body(response, "UP").await;

    registry.deregister(&registration).await.unwrap();
    let err = client.get("http://simple/").await.unwrap_err();
    assert!(matches!(err, LoadBalancerError::NoInstancesAvailable(_)));

    registry.close().await.unwrap();
}
