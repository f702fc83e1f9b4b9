use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::services::discovery::LocalDiscoveryClient;
use crate::services::registry::{
    ApplicationInfoManager, EurekaHealthCheckHandler, EurekaRegistration, EurekaServiceRegistry,
    HealthCheckHandler, InstanceInfo, InstanceInfoManager, InstanceStatus, ServiceRegistry,
};

#[derive(Debug, Deserialize)]
struct ParamQuery {
    param: String,
}

async fn hello() -> &'static str {
    "hello"
}

async fn hello_path(Path(param): Path<String>) -> String {
    format!("hello {param}")
}

async fn hello_request(Query(query): Query<ParamQuery>) -> String {
    format!("hello {}", query.param)
}

async fn hello_post(body: String) -> String {
    format!("hello {body}")
}

async fn hello_empty_post() -> &'static str {
    "hello empty"
}

async fn hello_header(headers: HeaderMap) -> Result<String, StatusCode> {
    let param = headers
        .get("x-param")
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    Ok(format!("hello {param}"))
}

// 只有 UP 时返回 200
async fn health(State(info_manager): State<Arc<dyn InstanceInfoManager>>) -> (StatusCode, String) {
    let status = info_manager
        .info()
        .map(|info| info.status)
        .unwrap_or(InstanceStatus::Unknown);
    let code = if status == InstanceStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, status.to_string())
}

pub fn router(info_manager: Arc<dyn InstanceInfoManager>) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/path/:param", get(hello_path))
        .route("/request", get(hello_request))
        .route("/post", post(hello_post))
        .route("/emptypost", post(hello_empty_post))
        .route("/header", get(hello_header))
        .route("/health", get(health))
        .with_state(info_manager)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(("0.0.0.0", config.instance.non_secure_port)).await?;
    let local_addr = listener.local_addr()?;

    let info_manager = Arc::new(ApplicationInfoManager::new());
    let health_check_handler: Option<Arc<dyn HealthCheckHandler>> =
        if config.client.healthcheck_enabled {
            Some(Arc::new(EurekaHealthCheckHandler::new()))
        } else {
            None
        };

    let mut registration = EurekaRegistration::new(
        Box::new(config.instance.clone()),
        info_manager.clone(),
        health_check_handler,
    );

    // 配置端口为 0 时使用实际绑定的端口
    if registration.non_secure_port() == 0 {
        registration.set_non_secure_port(local_addr.port());
    }
    info_manager.initialize(InstanceInfo::from_config(registration.instance_config()));

    let discovery_client = Arc::new(LocalDiscoveryClient::new(info_manager.clone()));
    let registry = EurekaServiceRegistry::new(discovery_client.clone());

    if config.client.register_with_eureka {
        registry.register(&registration).await?;
    } else {
        tracing::info!("Registration with eureka disabled");
    }

    // 健康检查处理器只在刷新时被询问
    let refresh_task = registration.health_check_handler().map(|_| {
        let period = Duration::from_secs(config.client.instance_info_replication_interval_secs);
        tracing::info!(period_secs = period.as_secs(), "Health check refresh enabled");
        discovery_client.spawn_refresh_task(period)
    });

    tracing::info!(
        addr = %local_addr,
        app_name = %registration.instance_config().app_name(),
        "Instance server listening"
    );

    axum::serve(listener, router(info_manager))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if config.client.register_with_eureka {
        registry.deregister(&registration).await?;
    }
    registry.close().await?;
    if let Some(task) = refresh_task {
        task.abort();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registry::EurekaInstanceConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_follows_instance_status() {
        let manager = Arc::new(ApplicationInfoManager::from_config(
            &EurekaInstanceConfig::new("simple"),
        ));
        let app = router(manager.clone());

        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app.clone(), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "STARTING");

        manager.set_instance_status(InstanceStatus::Up).unwrap();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "UP");
    }

    #[tokio::test]
    async fn test_header_is_required() {
        let app = router(Arc::new(ApplicationInfoManager::new()));

        let request = Request::get("/header").body(Body::empty()).unwrap();
        let (status, _) = call(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::get("/header")
            .header("X-Param", "world")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello world");
    }
}
