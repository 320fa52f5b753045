//! 路由模块

use axum::{
    routing::{any, get},
    Router,
};
use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/query", any(handlers::execute_query))
        .route(
            "/api/query/{server}/{database}/{username}/{password}",
            any(handlers::execute_query_with_route_credentials),
        )
        .route("/api/sql", any(handlers::echo_sql_missing))
        .route("/api/sql/{*sql}", any(handlers::echo_sql))
        .route("/api/health", get(handlers::health_check))
}
