pub mod admin;
pub mod customer;
pub mod floor_plan;
pub mod notifications;
pub mod restaurants;
pub mod service_hours;

use std::str::FromStr;

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::{AppError, AppResult};

/// `Json` body whose rejections render as the usual error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Parse an optional query parameter, treating an empty value as absent.
pub(crate) fn parse_param<T: FromStr>(name: &str, value: Option<&str>) -> AppResult<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Valor no válido para {}: {}", name, raw))),
    }
}
