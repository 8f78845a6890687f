use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::restaurant;
use crate::entities::restaurant_table::{self, TableShape};
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath};
use crate::AppState;

fn validate_geometry(capacity: i32, width: f64, height: f64) -> AppResult<()> {
    if capacity < 1 {
        return Err(AppError::BadRequest("La capacidad debe ser al menos 1".to_string()));
    }

    if !(width > 0.0 && height > 0.0) {
        return Err(AppError::BadRequest(
            "El ancho y el alto deben ser positivos".to_string(),
        ));
    }

    Ok(())
}

async fn ensure_unique_name(
    state: &AppState,
    restaurant_id: Uuid,
    name: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let mut query = restaurant_table::Entity::find()
        .filter(restaurant_table::Column::RestaurantId.eq(restaurant_id))
        .filter(restaurant_table::Column::Name.eq(name));

    if let Some(id) = exclude {
        query = query.filter(restaurant_table::Column::Id.ne(id));
    }

    if query.one(&*state.db).await?.is_some() {
        return Err(AppError::Conflict(format!("Ya existe una mesa llamada {}", name)));
    }

    Ok(())
}

/// Floor plan of a restaurant (admin)
pub async fn list_tables(
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<restaurant_table::Model>>> {
    let tables = restaurant_table::Entity::find()
        .filter(restaurant_table::Column::RestaurantId.eq(restaurant_id))
        .order_by_asc(restaurant_table::Column::Name)
        .all(&*state.db)
        .await?;

    Ok(Json(tables))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub name: String,
    pub capacity: i32,
    pub pos_x: f64,
    pub pos_y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape: Option<TableShape>,
    pub reservable: Option<bool>,
}

/// Place a new table on the floor plan (admin)
pub async fn create_table(
    State(state): State<AppState>,
    AppPath(restaurant_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateTableRequest>,
) -> AppResult<(StatusCode, Json<restaurant_table::Model>)> {
    restaurant::Entity::find_by_id(restaurant_id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurante no encontrado".to_string()))?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("El nombre de la mesa es obligatorio".to_string()));
    }

    let width = payload.width.unwrap_or(60.0);
    let height = payload.height.unwrap_or(60.0);
    validate_geometry(payload.capacity, width, height)?;
    ensure_unique_name(&state, restaurant_id, &name, None).await?;

    let table = restaurant_table::ActiveModel {
        id: Set(Uuid::new_v4()),
        restaurant_id: Set(restaurant_id),
        name: Set(name),
        capacity: Set(payload.capacity),
        pos_x: Set(payload.pos_x),
        pos_y: Set(payload.pos_y),
        width: Set(width),
        height: Set(height),
        shape: Set(payload.shape.unwrap_or(TableShape::Rect)),
        reservable: Set(payload.reservable.unwrap_or(true)),
    };

    let result = table.insert(&*state.db).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTableRequest {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub pos_x: Option<f64>,
    pub pos_y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape: Option<TableShape>,
    pub reservable: Option<bool>,
}

/// Move, resize or edit a table (admin)
pub async fn update_table(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateTableRequest>,
) -> AppResult<Json<restaurant_table::Model>> {
    let table = restaurant_table::Entity::find_by_id(id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Mesa no encontrada".to_string()))?;

    validate_geometry(
        payload.capacity.unwrap_or(table.capacity),
        payload.width.unwrap_or(table.width),
        payload.height.unwrap_or(table.height),
    )?;

    if let Some(name) = payload.name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(AppError::BadRequest("El nombre de la mesa es obligatorio".to_string()));
        }
        if name != table.name {
            ensure_unique_name(&state, table.restaurant_id, name, Some(table.id)).await?;
        }
    }

    let mut active: restaurant_table::ActiveModel = table.into();

    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(capacity) = payload.capacity {
        active.capacity = Set(capacity);
    }
    if let Some(x) = payload.pos_x {
        active.pos_x = Set(x);
    }
    if let Some(y) = payload.pos_y {
        active.pos_y = Set(y);
    }
    if let Some(width) = payload.width {
        active.width = Set(width);
    }
    if let Some(height) = payload.height {
        active.height = Set(height);
    }
    if let Some(shape) = payload.shape {
        active.shape = Set(shape);
    }
    if let Some(flag) = payload.reservable {
        active.reservable = Set(flag);
    }

    let result = active.update(&*state.db).await?;
    Ok(Json(result))
}

/// Remove a table; reservations seated there lose their assignment (admin)
pub async fn delete_table(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = restaurant_table::Entity::delete_by_id(id)
        .exec(&*state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Mesa no encontrada".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Mesa eliminada" })))
}
