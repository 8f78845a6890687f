use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::restaurant;
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath, AppQuery};
use crate::services::slots;
use crate::utils::time::{format_time, parse_date};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub timezone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<restaurant::Model> for RestaurantResponse {
    fn from(r: restaurant::Model) -> Self {
        Self {
            id: r.id,
            name: r.name,
            phone: r.phone,
            email: r.email,
            address: r.address,
            timezone: r.timezone,
            active: r.active,
            created_at: r.created_at.with_timezone(&Utc),
        }
    }
}

fn validate_timezone(value: &str) -> AppResult<String> {
    value
        .trim()
        .parse::<Tz>()
        .map(|tz| tz.name().to_string())
        .map_err(|_| AppError::BadRequest(format!("Zona horaria no válida: {}", value)))
}

// ============ Public ============

/// List restaurants currently taking bookings
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RestaurantResponse>>> {
    let restaurants = restaurant::Entity::find()
        .filter(restaurant::Column::Active.eq(true))
        .order_by_asc(restaurant::Column::Name)
        .all(&*state.db)
        .await?;

    Ok(Json(restaurants.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub slots: Vec<String>,
}

/// Bookable times for a restaurant on a given date
pub async fn availability(
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let date = parse_date(&query.date)
        .ok_or_else(|| AppError::BadRequest(format!("Fecha no válida: {}", query.date)))?;

    let restaurant = restaurant::Entity::find_by_id(restaurant_id)
        .one(&*state.db)
        .await?
        .filter(|r| r.active)
        .ok_or_else(|| AppError::NotFound("Restaurante no encontrado".to_string()))?;

    let slots = slots::slots_for_date(&state.db, restaurant.id, date).await?;

    Ok(Json(AvailabilityResponse {
        date,
        slots: slots.into_iter().map(format_time).collect(),
    }))
}

// ============ Admin ============

#[derive(Debug, Deserialize)]
pub struct CreateRestaurantRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: Option<String>,
    pub timezone: Option<String>,
}

/// Register a restaurant (admin)
pub async fn create_restaurant(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRestaurantRequest>,
) -> AppResult<(StatusCode, Json<RestaurantResponse>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("El nombre es obligatorio".to_string()));
    }

    let timezone = match payload.timezone.as_deref() {
        Some(tz) => validate_timezone(tz)?,
        None => state.config.timezone.name().to_string(),
    };

    let restaurant = restaurant::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        email: Set(payload.email.trim().to_string()),
        address: Set(payload.address),
        timezone: Set(timezone),
        active: Set(true),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let result = restaurant.insert(&*state.db).await?;
    tracing::info!(restaurant_id = %result.id, name = %result.name, "Restaurant created");

    Ok((StatusCode::CREATED, Json(result.into())))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub timezone: Option<String>,
    pub active: Option<bool>,
}

/// Update a restaurant (admin)
pub async fn update_restaurant(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRestaurantRequest>,
) -> AppResult<Json<RestaurantResponse>> {
    let restaurant = restaurant::Entity::find_by_id(id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurante no encontrado".to_string()))?;

    let mut active: restaurant::ActiveModel = restaurant.into();

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("El nombre es obligatorio".to_string()));
        }
        active.name = Set(name.trim().to_string());
    }

    if let Some(phone) = payload.phone {
        active.phone = Set(phone.trim().to_string());
    }

    if let Some(email) = payload.email {
        active.email = Set(email.trim().to_string());
    }

    if let Some(address) = payload.address {
        active.address = Set(Some(address));
    }

    if let Some(tz) = payload.timezone {
        active.timezone = Set(validate_timezone(&tz)?);
    }

    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }

    let result = active.update(&*state.db).await?;
    Ok(Json(result.into()))
}
