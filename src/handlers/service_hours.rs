use std::collections::HashSet;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::service::{self, DayType, Season, SlotMode};
use crate::entities::{restaurant, restaurant_table};
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath};
use crate::services::slots::generate_slots;
use crate::utils::time::{format_time, parse_time};
use crate::AppState;

const MIN_INTERVAL_MINUTES: i32 = 5;
const MAX_INTERVAL_MINUTES: i32 = 240;
const DEFAULT_INTERVAL_MINUTES: i32 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub day_type: DayType,
    pub season: Season,
    pub start_time: String,
    pub end_time: String,
    pub slot_mode: SlotMode,
    pub slot_interval_minutes: i32,
    pub table_ids: Vec<Uuid>,
    pub active: bool,
    /// Start times this service currently offers.
    pub slots: Vec<String>,
}

impl From<service::Model> for ServiceResponse {
    fn from(s: service::Model) -> Self {
        let slots = generate_slots(&s).into_iter().map(format_time).collect();
        let table_ids = s.eligible_tables();
        Self {
            id: s.id,
            restaurant_id: s.restaurant_id,
            name: s.name,
            day_type: s.day_type,
            season: s.season,
            start_time: format_time(s.start_time),
            end_time: format_time(s.end_time),
            slot_mode: s.slot_mode,
            slot_interval_minutes: s.slot_interval_minutes,
            table_ids,
            active: s.active,
            slots,
        }
    }
}

fn require_time(field: &str, value: &str) -> AppResult<NaiveTime> {
    parse_time(value)
        .ok_or_else(|| AppError::BadRequest(format!("{} no válida: {}", field, value)))
}

fn validate_window(start: NaiveTime, end: NaiveTime, interval: i32) -> AppResult<()> {
    if start >= end {
        return Err(AppError::BadRequest(
            "La hora de inicio debe ser anterior a la de fin".to_string(),
        ));
    }

    if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&interval) {
        return Err(AppError::BadRequest(format!(
            "El intervalo debe estar entre {} y {} minutos",
            MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES
        )));
    }

    Ok(())
}

/// Canonical `HH:MM` list for manual mode, rejecting anything unparseable.
fn normalize_slots(raw: &[String]) -> AppResult<serde_json::Value> {
    let mut times = raw
        .iter()
        .map(|s| require_time("Hora", s))
        .collect::<AppResult<Vec<_>>>()?;
    times.sort();
    times.dedup();

    Ok(serde_json::Value::from(
        times.into_iter().map(format_time).collect::<Vec<_>>(),
    ))
}

/// Drops repeated ids, keeping first-seen order.
fn unique_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

async fn ensure_tables_belong(
    state: &AppState,
    restaurant_id: Uuid,
    table_ids: &[Uuid],
) -> AppResult<()> {
    if table_ids.is_empty() {
        return Ok(());
    }

    let found = restaurant_table::Entity::find()
        .filter(restaurant_table::Column::RestaurantId.eq(restaurant_id))
        .filter(restaurant_table::Column::Id.is_in(table_ids.to_vec()))
        .all(&*state.db)
        .await?;

    if found.len() != table_ids.len() {
        return Err(AppError::BadRequest(
            "Alguna mesa no existe o pertenece a otro restaurante".to_string(),
        ));
    }

    Ok(())
}

/// Enforce one service per (restaurant, day type, start time).
async fn ensure_unique_start(
    state: &AppState,
    restaurant_id: Uuid,
    day_type: DayType,
    start_time: NaiveTime,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let mut query = service::Entity::find()
        .filter(service::Column::RestaurantId.eq(restaurant_id))
        .filter(service::Column::DayType.eq(day_type))
        .filter(service::Column::StartTime.eq(start_time));

    if let Some(id) = exclude {
        query = query.filter(service::Column::Id.ne(id));
    }

    if query.one(&*state.db).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Ya existe un servicio que empieza a las {} para ese tipo de día",
            format_time(start_time)
        )));
    }

    Ok(())
}

/// List a restaurant's services (admin)
pub async fn list_services(
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<ServiceResponse>>> {
    let services = service::Entity::find()
        .filter(service::Column::RestaurantId.eq(restaurant_id))
        .order_by_asc(service::Column::StartTime)
        .all(&*state.db)
        .await?;

    Ok(Json(services.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: String,
    pub day_type: DayType,
    pub season: Option<Season>,
    pub start_time: String,
    pub end_time: String,
    pub slot_mode: Option<SlotMode>,
    pub slot_interval_minutes: Option<i32>,
    pub time_slots: Option<Vec<String>>,
    pub table_ids: Option<Vec<Uuid>>,
}

/// Create a service for a restaurant (admin)
pub async fn create_service(
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateServiceRequest>,
) -> AppResult<(StatusCode, Json<ServiceResponse>)> {
    restaurant::Entity::find_by_id(restaurant_id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurante no encontrado".to_string()))?;

    let start = require_time("Hora de inicio", &payload.start_time)?;
    let end = require_time("Hora de fin", &payload.end_time)?;
    let interval = payload.slot_interval_minutes.unwrap_or(DEFAULT_INTERVAL_MINUTES);
    validate_window(start, end, interval)?;

    let slot_mode = payload.slot_mode.unwrap_or(SlotMode::Auto);
    let time_slots = match (&slot_mode, payload.time_slots.as_deref()) {
        (SlotMode::Manual, None) | (SlotMode::Manual, Some([])) => {
            return Err(AppError::BadRequest(
                "El modo manual necesita al menos una hora".to_string(),
            ));
        }
        (_, Some(raw)) => Some(normalize_slots(raw)?),
        (_, None) => None,
    };

    let table_ids = unique_ids(payload.table_ids.unwrap_or_default());
    ensure_tables_belong(&state, restaurant_id, &table_ids).await?;
    ensure_unique_start(&state, restaurant_id, payload.day_type, start, None).await?;

    let created = service::ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        name: Set(payload.name.trim().to_string()),
        day_type: Set(payload.day_type),
        season: Set(payload.season.unwrap_or(Season::TodoElAno)),
        start_time: Set(start),
        end_time: Set(end),
        slot_mode: Set(slot_mode),
        slot_interval_minutes: Set(interval),
        time_slots: Set(time_slots),
        table_ids: Set(table_ids_json(&table_ids)),
        active: Set(true),
    }
    .insert(&*state.db)
    .await?;

    tracing::info!(service_id = %created.id, restaurant_id = %restaurant_id, "Service created");

    Ok((StatusCode::CREATED, Json(created.into())))
}

fn table_ids_json(table_ids: &[Uuid]) -> Option<serde_json::Value> {
    if table_ids.is_empty() {
        None
    } else {
        Some(serde_json::Value::from(
            table_ids.iter().map(Uuid::to_string).collect::<Vec<_>>(),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub day_type: Option<DayType>,
    pub season: Option<Season>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub slot_mode: Option<SlotMode>,
    pub slot_interval_minutes: Option<i32>,
    pub time_slots: Option<Vec<String>>,
    pub table_ids: Option<Vec<Uuid>>,
    pub active: Option<bool>,
}

/// Update a service (admin)
pub async fn update_service(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateServiceRequest>,
) -> AppResult<Json<ServiceResponse>> {
    let current = service::Entity::find_by_id(id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Servicio no encontrado".to_string()))?;

    let start = match payload.start_time.as_deref() {
        Some(raw) => require_time("Hora de inicio", raw)?,
        None => current.start_time,
    };
    let end = match payload.end_time.as_deref() {
        Some(raw) => require_time("Hora de fin", raw)?,
        None => current.end_time,
    };
    let interval = payload.slot_interval_minutes.unwrap_or(current.slot_interval_minutes);
    validate_window(start, end, interval)?;

    let day_type = payload.day_type.unwrap_or(current.day_type);
    if day_type != current.day_type || start != current.start_time {
        ensure_unique_start(&state, current.restaurant_id, day_type, start, Some(current.id)).await?;
    }

    let slot_mode = payload.slot_mode.unwrap_or(current.slot_mode);
    let time_slots = match payload.time_slots.as_deref() {
        Some(raw) => Some(normalize_slots(raw)?),
        None => current.time_slots.clone(),
    };
    if slot_mode == SlotMode::Manual
        && time_slots.as_ref().and_then(|v| v.as_array()).is_none_or(|a| a.is_empty())
    {
        return Err(AppError::BadRequest(
            "El modo manual necesita al menos una hora".to_string(),
        ));
    }

    let restaurant_id = current.restaurant_id;
    let mut active: service::ActiveModel = current.into();

    if let Some(table_ids) = payload.table_ids {
        let table_ids = unique_ids(table_ids);
        ensure_tables_belong(&state, restaurant_id, &table_ids).await?;
        active.table_ids = Set(table_ids_json(&table_ids));
    }

    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }

    if let Some(season) = payload.season {
        active.season = Set(season);
    }

    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }

    active.day_type = Set(day_type);
    active.start_time = Set(start);
    active.end_time = Set(end);
    active.slot_mode = Set(slot_mode);
    active.slot_interval_minutes = Set(interval);
    active.time_slots = Set(time_slots);

    let result = active.update(&*state.db).await?;
    Ok(Json(result.into()))
}

/// Delete a service (admin)
pub async fn delete_service(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = service::Entity::delete_by_id(id).exec(&*state.db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Servicio no encontrado".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Servicio eliminado" })))
}
