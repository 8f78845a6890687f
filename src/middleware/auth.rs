use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims, StaffRole};
use crate::AppState;

/// Extract and validate the bearer token issued by the identity provider
pub async fn auth_middleware(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(auth) = auth
        .ok_or_else(|| AppError::Unauthorized("Falta el token de autenticación".to_string()))?;

    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require admin role
pub async fn require_admin(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if claims.role != StaffRole::Admin {
        tracing::warn!(subject = %claims.sub, "Non-admin tried to reach admin route");
        return Err(AppError::Forbidden("Se requiere acceso de administrador".to_string()));
    }

    Ok(next.run(request).await)
}
