//! SQL HTTP 触发服务
//!
//! 接收 SQL 文本并在目标数据库上执行，包括：
//! - 从 JSON 请求体、URL 查询参数或路由参数读取 SQL
//! - 从环境变量、请求体或路由参数读取连接凭据
//! - 以纯文本表格返回查询结果

mod driver;
mod handlers;
mod input;
mod routes;
mod service;
mod state;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{load_dotenv, AppConfig, CredentialSource};
use common::middleware::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "sql-trigger";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL 触发服务 API",
        version = "0.1.0",
        description = "通过 HTTP 执行 SQL 并返回文本表格"
    ),
    paths(
        handlers::execute_query,
        handlers::execute_query_with_route_credentials,
        handlers::echo_sql,
        handlers::echo_sql_missing,
        handlers::health_check,
    ),
    components(schemas(
        common::models::QueryBody,
        common::models::Credentials,
        common::models::DbKind,
        common::config::CredentialSource,
        handlers::HealthResponse,
    )),
    tags(
        (name = "query", description = "SQL 执行端点"),
        (name = "test", description = "路由参数回显端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME).context("加载配置失败")?;
    if config.credential_source == CredentialSource::Env && !config.credentials.is_complete() {
        warn!("SQLSERVER/SQLDATABASE/SQLUSERNAME/SQLPASSWORD 未全部设置，/api/query 将返回 500");
    }

    let addr = format!("{}:{}", config.host, config.port);
    info!(
        service = SERVICE_NAME,
        address = %addr,
        db_kind = %config.db_kind,
        credential_source = %config.credential_source,
        "启动服务"
    );

    let state = AppState::new(config);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app).await.context("服务运行失败")?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
