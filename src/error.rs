//! 错误处理

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 按 id 查询的资源不存在
    #[error("{0} not found")]
    NotFound(String),

    /// 过滤参数不是合法的等级名
    #[error("invalid query: {0}")]
    BadRequest(#[from] QueryRejection),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => {
                tracing::debug!("请求参数错误: {}", self);
                StatusCode::BAD_REQUEST
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
