use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath};
use crate::services::lifecycle::{self, BookingPolicy, NewBooking};
use crate::services::queries::{self, ReservationDetails};
use crate::utils::time::parse_time;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub restaurant_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub party_size: i32,
    pub customer: CustomerContact,
    pub special_requests: Option<String>,
}

/// Book a table. The reservation starts as PENDIENTE and holds the slot for a while.
pub async fn create_reservation(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationDetails>)> {
    let time = parse_time(&payload.time)
        .ok_or_else(|| AppError::BadRequest(format!("Hora no válida: {}", payload.time)))?;

    let booking = NewBooking {
        restaurant_id: payload.restaurant_id,
        date: payload.date,
        time,
        party_size: payload.party_size,
        customer_name: payload.customer.name,
        customer_phone: payload.customer.phone,
        customer_email: payload
            .customer
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
        special_requests: payload.special_requests,
    };

    let policy = BookingPolicy {
        fallback_timezone: state.config.timezone,
        session_hold_minutes: state.config.session_hold_minutes,
    };

    let created = lifecycle::create(&state.db, &policy, booking, Utc::now()).await?;

    let details = queries::attach_relations(&state.db, vec![created])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Reservation vanished while loading relations".to_string()))?;

    Ok((StatusCode::CREATED, Json(details)))
}

/// Look up a reservation by the code the customer received
pub async fn lookup_by_code(
    State(state): State<AppState>,
    AppPath(code): AppPath<String>,
) -> AppResult<Json<ReservationDetails>> {
    let details = queries::find_by_code(&state.db, &code).await?;
    Ok(Json(details))
}
