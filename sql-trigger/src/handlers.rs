//! Handler模块

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::Uri,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::config::CredentialSource;
use common::errors::{AppError, AppResult, MISSING_ROUTE_SQL};
use common::models::{Credentials, DbKind, QueryParams};
use crate::input::{resolve_credentials, resolve_query, RequestBody};
use crate::service::QueryService;
use crate::state::AppState;

/// 执行 SQL 查询（凭据来自环境变量或请求体）
#[utoipa::path(
    post,
    path = "/api/query",
    tag = "query",
    params(QueryParams),
    request_body = common::models::QueryBody,
    responses(
        (status = 200, description = "查询执行成功，返回文本表格", body = String, content_type = "text/plain"),
        (status = 400, description = "缺少 SQL 查询"),
        (status = 500, description = "缺少连接参数或数据库错误")
    )
)]
pub async fn execute_query(
    State(state): State<AppState>,
    uri: Uri,
    body: Bytes,
) -> AppResult<String> {
    tracing::info!("SQL HTTP trigger processed a request");

    let body = RequestBody::parse(&body);
    let credentials = resolve_credentials(&state.config, &body)?;
    run_query(&state, &credentials, &body, &uri).await
}

/// 执行 SQL 查询（凭据来自路由参数）
#[utoipa::path(
    post,
    path = "/api/query/{server}/{database}/{username}/{password}",
    tag = "query",
    params(
        ("server" = String, Path, description = "数据库服务器，可配置自动追加域名后缀"),
        ("database" = String, Path, description = "数据库名"),
        ("username" = String, Path, description = "登录用户名"),
        ("password" = String, Path, description = "登录密码"),
        QueryParams
    ),
    request_body = common::models::QueryBody,
    responses(
        (status = 200, description = "查询执行成功，返回文本表格", body = String, content_type = "text/plain"),
        (status = 400, description = "缺少 SQL 查询"),
        (status = 500, description = "数据库错误")
    )
)]
pub async fn execute_query_with_route_credentials(
    State(state): State<AppState>,
    Path(credentials): Path<Credentials>,
    uri: Uri,
    body: Bytes,
) -> AppResult<String> {
    tracing::info!("SQL HTTP trigger processed a request");

    credentials
        .validate()
        .map_err(|_| AppError::missing_connection_parameters())?;
    let credentials = credentials.with_server_domain(state.config.server_domain.as_deref());

    let body = RequestBody::parse(&body);
    run_query(&state, &credentials, &body, &uri).await
}

async fn run_query(
    state: &AppState,
    credentials: &Credentials,
    body: &RequestBody,
    uri: &Uri,
) -> AppResult<String> {
    let query = resolve_query(body, uri)?;
    let service = QueryService::new(state.connector.clone(), state.config.clone());
    let outcome = service.execute(credentials, &query).await?;
    Ok(outcome.into_body())
}

/// 回显路由中的 SQL 参数
#[utoipa::path(
    get,
    path = "/api/sql/{sql}",
    tag = "test",
    params(("sql" = String, Path, description = "任意 SQL 文本")),
    responses(
        (status = 200, description = "回显成功", body = String, content_type = "text/plain")
    )
)]
pub async fn echo_sql(Path(sql): Path<String>) -> AppResult<String> {
    tracing::info!("SQL route parameter trigger processed a request");
    if sql.trim().is_empty() {
        return Err(AppError::Input(MISSING_ROUTE_SQL.to_string()));
    }
    Ok(format!("SQL Parameter: {}", sql))
}

/// 路由中缺少 SQL 参数
#[utoipa::path(
    get,
    path = "/api/sql",
    tag = "test",
    responses(
        (status = 400, description = "缺少 SQL 路由参数")
    )
)]
pub async fn echo_sql_missing() -> AppError {
    AppError::Input(MISSING_ROUTE_SQL.to_string())
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_kind: state.config.db_kind,
        credential_source: state.config.credential_source,
        timestamp: Utc::now(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub db_kind: DbKind,
    pub credential_source: CredentialSource,
    pub timestamp: DateTime<Utc>,
}
