//! Read-only views over reservations for the admin dashboard and the
//! customer-facing lookup.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::{customer, restaurant};
use crate::error::{AppError, AppResult};
use crate::utils::code::normalize_code;
use crate::utils::time::{format_time, local_now};

pub const DEFAULT_DAYS_AHEAD: i64 = 7;
pub const MAX_DAYS_AHEAD: i64 = 365;
pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const MAX_PAGE_LIMIT: u64 = 200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub timezone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// A reservation joined with its restaurant and customer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    pub id: Uuid,
    pub code: String,
    pub date: NaiveDate,
    pub time: String,
    pub party_size: i32,
    pub status: ReservationStatus,
    pub table_id: Option<Uuid>,
    pub session_expires_at: Option<DateTime<Utc>>,
    pub special_requests: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub restaurant: Option<RestaurantSummary>,
    pub customer: Option<CustomerSummary>,
}

impl ReservationDetails {
    pub fn new(
        r: reservation::Model,
        restaurant: Option<&restaurant::Model>,
        customer: Option<&customer::Model>,
    ) -> Self {
        Self {
            id: r.id,
            code: r.code,
            date: r.date,
            time: format_time(r.time),
            party_size: r.party_size,
            status: r.status,
            table_id: r.table_id,
            session_expires_at: r.session_expires_at.map(|t| t.with_timezone(&Utc)),
            special_requests: r.special_requests,
            confirmed_at: r.confirmed_at.map(|t| t.with_timezone(&Utc)),
            cancelled_at: r.cancelled_at.map(|t| t.with_timezone(&Utc)),
            created_at: r.created_at.with_timezone(&Utc),
            updated_at: r.updated_at.with_timezone(&Utc),
            restaurant: restaurant.map(|x| RestaurantSummary {
                id: x.id,
                name: x.name.clone(),
                phone: x.phone.clone(),
                timezone: x.timezone.clone(),
            }),
            customer: customer.map(|c| CustomerSummary {
                id: c.id,
                name: c.name.clone(),
                phone: c.phone.clone(),
                email: c.email.clone(),
            }),
        }
    }
}

/// Load restaurants and customers for a page of reservations in two queries.
pub async fn attach_relations(
    db: &DatabaseConnection,
    reservations: Vec<reservation::Model>,
) -> AppResult<Vec<ReservationDetails>> {
    if reservations.is_empty() {
        return Ok(Vec::new());
    }

    let restaurant_ids: Vec<Uuid> = reservations.iter().map(|r| r.restaurant_id).collect();
    let customer_ids: Vec<Uuid> = reservations.iter().map(|r| r.customer_id).collect();

    let restaurants: HashMap<Uuid, restaurant::Model> = restaurant::Entity::find()
        .filter(restaurant::Column::Id.is_in(restaurant_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let customers: HashMap<Uuid, customer::Model> = customer::Entity::find()
        .filter(customer::Column::Id.is_in(customer_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(reservations
        .into_iter()
        .map(|r| {
            let restaurant = restaurants.get(&r.restaurant_id);
            let customer = customers.get(&r.customer_id);
            ReservationDetails::new(r, restaurant, customer)
        })
        .collect())
}

// ============ Pending queue ============

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStats {
    pub total: usize,
    pub today: usize,
    pub expired_sessions: usize,
    pub upcoming_hour: usize,
    /// Holds that have lapsed. Reported only; cleanup is up to the caller.
    pub expired_session_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PendingQueue {
    pub reservations: Vec<ReservationDetails>,
    pub stats: PendingStats,
}

pub fn pending_window_query(today: NaiveDate, days_ahead: i64) -> Select<reservation::Entity> {
    let last_day = today + Duration::days(days_ahead);

    reservation::Entity::find()
        .filter(reservation::Column::Status.eq(ReservationStatus::Pending))
        .filter(reservation::Column::Date.between(today, last_day))
        .order_by_desc(reservation::Column::Date)
        .order_by_desc(reservation::Column::Time)
}

pub fn compute_pending_stats(
    reservations: &[reservation::Model],
    now_local: NaiveDateTime,
    now: DateTime<Utc>,
) -> PendingStats {
    let today = now_local.date();
    let hour_later = now_local + Duration::hours(1);

    let expired_session_ids: Vec<Uuid> = reservations
        .iter()
        .filter(|r| {
            r.session_expires_at
                .map(|expires| expires.with_timezone(&Utc) < now)
                .unwrap_or(false)
        })
        .map(|r| r.id)
        .collect();

    PendingStats {
        total: reservations.len(),
        today: reservations.iter().filter(|r| r.date == today).count(),
        expired_sessions: expired_session_ids.len(),
        upcoming_hour: reservations
            .iter()
            .filter(|r| {
                let starts = r.date.and_time(r.time);
                starts >= now_local && starts <= hour_later
            })
            .count(),
        expired_session_ids,
    }
}

pub async fn pending_queue(
    db: &DatabaseConnection,
    tz: Tz,
    now: DateTime<Utc>,
    days_ahead: i64,
) -> AppResult<PendingQueue> {
    if !(0..=MAX_DAYS_AHEAD).contains(&days_ahead) {
        return Err(AppError::BadRequest(format!(
            "daysAhead debe estar entre 0 y {}",
            MAX_DAYS_AHEAD
        )));
    }

    let now_local = local_now(tz, now);
    let reservations = pending_window_query(now_local.date(), days_ahead)
        .all(db)
        .await?;

    let stats = compute_pending_stats(&reservations, now_local, now);
    if stats.expired_sessions > 0 {
        tracing::debug!(count = stats.expired_sessions, "Pending reservations with lapsed holds");
    }

    Ok(PendingQueue {
        reservations: attach_relations(db, reservations).await?,
        stats,
    })
}

// ============ Admin listing ============

#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub status: Option<ReservationStatus>,
    pub date: Option<NaiveDate>,
    pub restaurant_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPage {
    pub reservations: Vec<ReservationDetails>,
    pub pagination: Pagination,
    /// Pending backlog across all restaurants and dates, regardless of filters.
    pub pending_count: u64,
}

pub fn filtered_query(filter: &ListFilter) -> Select<reservation::Entity> {
    let mut query = reservation::Entity::find();

    if let Some(status) = filter.status {
        query = query.filter(reservation::Column::Status.eq(status));
    }
    if let Some(date) = filter.date {
        query = query.filter(reservation::Column::Date.eq(date));
    }
    if let Some(restaurant_id) = filter.restaurant_id {
        query = query.filter(reservation::Column::RestaurantId.eq(restaurant_id));
    }

    query
}

pub fn pending_count_query() -> Select<reservation::Entity> {
    reservation::Entity::find().filter(reservation::Column::Status.eq(ReservationStatus::Pending))
}

pub async fn list_reservations(
    db: &DatabaseConnection,
    filter: &ListFilter,
    limit: u64,
    offset: u64,
) -> AppResult<ReservationPage> {
    let total = filtered_query(filter).count(db).await?;

    let page = filtered_query(filter)
        .order_by_desc(reservation::Column::Date)
        .order_by_desc(reservation::Column::Time)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    let pending_count = pending_count_query().count(db).await?;

    Ok(ReservationPage {
        reservations: attach_relations(db, page).await?,
        pagination: Pagination { limit, offset, total },
        pending_count,
    })
}

// ============ Lookup by code ============

pub async fn find_by_code(db: &DatabaseConnection, input: &str) -> AppResult<ReservationDetails> {
    let code = normalize_code(input)
        .ok_or_else(|| AppError::BadRequest("Código de reserva no válido".to_string()))?;

    let found = reservation::Entity::find()
        .filter(reservation::Column::Code.eq(code.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

    attach_relations(db, vec![found])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Reservation vanished while loading relations".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::{NaiveTime, TimeZone};
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait, Value};

    fn pending(date: NaiveDate, time: NaiveTime) -> reservation::Model {
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap().fixed_offset();
        reservation::Model {
            id: Uuid::new_v4(),
            code: "RES-AB12C".to_string(),
            restaurant_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            table_id: None,
            date,
            time,
            party_size: 2,
            status: ReservationStatus::Pending,
            session_expires_at: None,
            special_requests: None,
            confirmed_at: None,
            cancelled_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_pending_window_query_bounds() {
        let sql = pending_window_query(d(1), 7).build(DatabaseBackend::Postgres).to_string();

        assert!(sql.contains("'PENDIENTE'"));
        assert!(sql.contains("BETWEEN '2025-06-01' AND '2025-06-08'"));
        assert!(sql.contains(r#"ORDER BY "reservation"."date" DESC, "reservation"."time" DESC"#));
    }

    #[test]
    fn test_pending_count_ignores_filters() {
        let filter = ListFilter {
            status: Some(ReservationStatus::Confirmed),
            date: Some(d(1)),
            restaurant_id: Some(Uuid::nil()),
        };
        let filtered = filtered_query(&filter).build(DatabaseBackend::Postgres).to_string();
        let pending = pending_count_query().build(DatabaseBackend::Postgres).to_string();

        let nil = format!("'{}'", Uuid::nil());

        assert!(filtered.contains("'CONFIRMADO'"));
        assert!(filtered.contains(&nil));
        assert!(filtered.contains("'2025-06-01'"));
        assert!(pending.contains("'PENDIENTE'"));
        assert!(!pending.contains("'CONFIRMADO'"));
        assert!(!pending.contains(&nil));
        assert!(!pending.contains("'2025-06-01'"));
    }

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let sql = filtered_query(&ListFilter::default()).build(DatabaseBackend::Postgres).to_string();
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_pending_stats() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 18, 15, 0).unwrap();
        let now_local = d(1).and_time(t(20, 15)); // Madrid, UTC+2

        let mut lapsed = pending(d(1), t(20, 45));
        lapsed.session_expires_at = Some(now.fixed_offset() - Duration::minutes(5));
        let mut held = pending(d(1), t(23, 0));
        held.session_expires_at = Some(now.fixed_offset() + Duration::minutes(5));
        let earlier_today = pending(d(1), t(13, 0));
        let next_week = pending(d(8), t(20, 30));

        let rows = vec![lapsed.clone(), held, earlier_today, next_week];
        let stats = compute_pending_stats(&rows, now_local, now);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.today, 3);
        assert_eq!(stats.expired_sessions, 1);
        assert_eq!(stats.expired_session_ids, vec![lapsed.id]);
        assert_eq!(stats.upcoming_hour, 1);
    }

    #[test]
    fn test_upcoming_hour_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 21, 30, 0).unwrap();
        let now_local = d(1).and_time(t(23, 30));
        let rows = vec![pending(d(2), t(0, 15)), pending(d(2), t(1, 0))];

        assert_eq!(compute_pending_stats(&rows, now_local, now).upcoming_hour, 1);
    }

    #[tokio::test]
    async fn test_pending_queue_rejects_negative_window() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = pending_queue(&db, chrono_tz::Europe::Madrid, Utc::now(), -1).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_find_by_code_normalizes_input() {
        let stored = pending(d(1), t(21, 0));
        let restaurant = restaurant::Model {
            id: stored.restaurant_id,
            name: "Casa Lola".to_string(),
            phone: "+34910000000".to_string(),
            email: "hola@casalola.es".to_string(),
            address: None,
            timezone: "Europe/Madrid".to_string(),
            active: true,
            created_at: stored.created_at,
        };
        let customer = customer::Model {
            id: stored.customer_id,
            name: "Lucía".to_string(),
            phone: "+34600111222".to_string(),
            email: None,
            created_at: stored.created_at,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored.clone()]])
            .append_query_results([vec![restaurant]])
            .append_query_results([vec![customer]])
            .into_connection();

        let found = find_by_code(&db, "res-ab12c").await.unwrap();
        assert_eq!(found.code, "RES-AB12C");
        assert_eq!(found.restaurant.map(|r| r.name).as_deref(), Some("Casa Lola"));
        assert_eq!(found.customer.map(|c| c.name).as_deref(), Some("Lucía"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("RES-AB12C"));
    }

    #[tokio::test]
    async fn test_find_by_code_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<reservation::Model>::new()])
            .into_connection();

        let result = find_by_code(&db, "RES-ZZZZZ").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    fn relations(r: &reservation::Model) -> (restaurant::Model, customer::Model) {
        let restaurant = restaurant::Model {
            id: r.restaurant_id,
            name: "Casa Lola".to_string(),
            phone: "+34910000000".to_string(),
            email: "hola@casalola.es".to_string(),
            address: None,
            timezone: "Europe/Madrid".to_string(),
            active: true,
            created_at: r.created_at,
        };
        let customer = customer::Model {
            id: r.customer_id,
            name: "Lucía".to_string(),
            phone: "+34600111222".to_string(),
            email: None,
            created_at: r.created_at,
        };
        (restaurant, customer)
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn test_list_reservations_pending_count_is_global() {
        let mut confirmed = pending(d(1), t(21, 0));
        confirmed.status = ReservationStatus::Confirmed;
        let (restaurant, customer) = relations(&confirmed);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(1)]])
            .append_query_results([vec![confirmed.clone()]])
            .append_query_results([[count_row(9)]])
            .append_query_results([vec![restaurant]])
            .append_query_results([vec![customer]])
            .into_connection();

        let filter = ListFilter {
            status: Some(ReservationStatus::Confirmed),
            date: Some(d(1)),
            restaurant_id: Some(confirmed.restaurant_id),
        };
        let page = list_reservations(&db, &filter, 20, 0).await.unwrap();

        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.pending_count, 9);
        assert_eq!(page.reservations.len(), 1);
        assert_eq!(page.reservations[0].status, ReservationStatus::Confirmed);

        let log = db.into_transaction_log();
        let filtered_count = format!("{:?}", log[0]);
        let pending_count = format!("{:?}", log[2]);
        let restaurant_id = confirmed.restaurant_id.to_string();

        assert!(filtered_count.contains("CONFIRMADO"));
        assert!(filtered_count.contains(&restaurant_id));
        assert!(pending_count.contains("PENDIENTE"));
        assert!(!pending_count.contains("CONFIRMADO"));
        assert!(!pending_count.contains(&restaurant_id));
        assert!(!pending_count.contains("2025-06-01"));
    }

    #[tokio::test]
    async fn test_pending_queue_end_to_end() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 18, 15, 0).unwrap();

        let mut lapsed = pending(d(1), t(20, 45));
        lapsed.session_expires_at = Some(now.fixed_offset() - Duration::minutes(5));
        let mut later = pending(d(3), t(14, 0));
        later.restaurant_id = lapsed.restaurant_id;
        later.customer_id = lapsed.customer_id;
        let (restaurant, customer) = relations(&lapsed);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![later.clone(), lapsed.clone()]])
            .append_query_results([vec![restaurant]])
            .append_query_results([vec![customer]])
            .into_connection();

        let queue = pending_queue(&db, chrono_tz::Europe::Madrid, now, 7).await.unwrap();

        assert_eq!(queue.stats.total, 2);
        assert_eq!(queue.stats.today, 1);
        assert_eq!(queue.stats.upcoming_hour, 1);
        assert_eq!(queue.stats.expired_session_ids, vec![lapsed.id]);
        assert_eq!(queue.reservations[0].id, later.id);
        assert_eq!(
            queue.reservations[1].restaurant.as_ref().map(|r| r.name.as_str()),
            Some("Casa Lola")
        );

        let window = format!("{:?}", db.into_transaction_log()[0]);
        assert!(window.contains("PENDIENTE"));
        assert!(window.contains("2025-06-01"));
        assert!(window.contains("2025-06-08"));
    }
}
