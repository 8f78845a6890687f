use axum::{
    extract::State,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::reservation::{self, ReservationStatus};
use crate::error::{AppError, AppResult};
use crate::handlers::{parse_param, AppJson, AppPath, AppQuery};
use crate::services::lifecycle;
use crate::services::queries::{
    self, ListFilter, PendingQueue, ReservationDetails, ReservationPage, DEFAULT_DAYS_AHEAD,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use crate::utils::time::parse_date;
use crate::AppState;

// ============ Approve / reject ============

#[derive(Debug, Deserialize)]
pub struct ReservationActionRequest {
    pub action: String,
    pub reason: Option<String>,
}

/// Approve or reject a reservation (admin)
pub async fn reservation_action(
    State(state): State<AppState>,
    AppPath(reservation_id): AppPath<Uuid>,
    AppJson(payload): AppJson<ReservationActionRequest>,
) -> AppResult<Json<ReservationDetails>> {
    let now = Utc::now();

    let updated = match payload.action.trim() {
        "approve" => {
            let updated = lifecycle::approve(&state.db, reservation_id, now).await?;
            notify_confirmation(&state, updated.id);
            updated
        }
        "reject" => lifecycle::reject(&state.db, reservation_id, payload.reason, now).await?,
        other => {
            return Err(AppError::BadRequest(format!(
                "Acción no válida: '{}'. Usa 'approve' o 'reject'",
                other
            )));
        }
    };

    single_details(&state, updated).await
}

/// Fire the confirmation message without holding up the response.
fn notify_confirmation(state: &AppState, reservation_id: Uuid) {
    if !state.notifier.is_enabled() {
        return;
    }

    let db = state.db.clone();
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send_reservation_confirmation(&db, reservation_id).await {
            tracing::error!(reservation_id = %reservation_id, error = %e, "Confirmation notification failed");
        }
    });
}

async fn single_details(
    state: &AppState,
    reservation: reservation::Model,
) -> AppResult<Json<ReservationDetails>> {
    queries::attach_relations(&state.db, vec![reservation])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("Reservation vanished while loading relations".to_string()))
}

// ============ Pending queue ============

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(rename = "daysAhead")]
    pub days_ahead: Option<String>,
}

/// Pending reservations for the coming days plus queue statistics (admin)
pub async fn pending_reservations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PendingQuery>,
) -> AppResult<Json<PendingQueue>> {
    let days_ahead = parse_param::<i64>("daysAhead", query.days_ahead.as_deref())?
        .unwrap_or(DEFAULT_DAYS_AHEAD);

    let queue = queries::pending_queue(&state.db, state.config.timezone, Utc::now(), days_ahead).await?;
    Ok(Json(queue))
}

// ============ Listing ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReservationsQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub restaurant_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListReservationsQuery {
    fn filter(&self) -> AppResult<ListFilter> {
        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            None => None,
            Some(raw) => Some(parse_date(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Fecha no válida: {} (formato AAAA-MM-DD)", raw))
            })?),
        };

        Ok(ListFilter {
            status: parse_param::<ReservationStatus>("status", self.status.as_deref())?,
            date,
            restaurant_id: parse_param::<Uuid>("restaurantId", self.restaurant_id.as_deref())?,
        })
    }
}

/// Filtered, paginated reservation list with the global pending count (admin)
pub async fn list_reservations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListReservationsQuery>,
) -> AppResult<Json<ReservationPage>> {
    let filter = query.filter()?;
    let limit = parse_param::<u64>("limit", query.limit.as_deref())?.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = parse_param::<u64>("offset", query.offset.as_deref())?.unwrap_or(0);

    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit debe estar entre 1 y {}",
            MAX_PAGE_LIMIT
        )));
    }

    let page = queries::list_reservations(&state.db, &filter, limit, offset).await?;
    Ok(Json(page))
}

// ============ Table assignment ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTableRequest {
    pub table_id: Option<Uuid>,
}

/// Seat a reservation at a floor-plan table, or clear it with `tableId: null` (admin)
pub async fn assign_table(
    State(state): State<AppState>,
    AppPath(reservation_id): AppPath<Uuid>,
    AppJson(payload): AppJson<AssignTableRequest>,
) -> AppResult<Json<ReservationDetails>> {
    let updated = lifecycle::assign_table(&state.db, reservation_id, payload.table_id, Utc::now()).await?;
    single_details(&state, updated).await
}
