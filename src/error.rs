use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by handlers. Every variant renders as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Notification error: {0}")]
    Notification(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Database error: {0}")]
    Database(DbErr),
}

const GENERIC_ERROR_MESSAGE: &str = "Error interno del servidor";
const DUPLICATE_MESSAGE: &str = "Ya existe un registro con esos datos";

/// Postgres reports unique index hits with SQLSTATE 23505. Errors that lost the
/// driver type on the way (mock connections) still carry the server message.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err
            .to_string()
            .contains("duplicate key value violates unique constraint")
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if is_unique_violation(&err) {
            tracing::debug!(error = %err, "Unique constraint hit");
            return Self::Conflict(DUPLICATE_MESSAGE.to_string());
        }
        Self::Database(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Se esperaba Content-Type: application/json".to_string()
            }
            JsonRejection::JsonSyntaxError(_) => "El cuerpo no es JSON válido".to_string(),
            JsonRejection::JsonDataError(e) => format!("Datos no válidos: {}", e.body_text()),
            other => format!("Cuerpo de la petición no válido: {}", other.body_text()),
        };
        Self::BadRequest(message)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Parámetro de ruta no válido: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Parámetros de consulta no válidos: {}", rejection.body_text()))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Notification(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Notification(msg) => msg,
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                GENERIC_ERROR_MESSAGE.to_string()
            }
            Self::Database(err) => {
                tracing::error!(error = %err, "Database error");
                GENERIC_ERROR_MESSAGE.to_string()
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
