//! Reservation state changes: booking creation, table assignment and the
//! admin approve/reject workflow. Status changes are written together with
//! their history row inside a single transaction.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::{customer, reservation_history, restaurant, restaurant_table};
use crate::error::{AppError, AppResult};
use crate::services::slots;
use crate::utils::code::generate_code;
use crate::utils::time::{format_time, local_now};

pub const DEFAULT_REJECTION_REASON: &str = "Sin motivo especificado";
pub const MAX_PARTY_SIZE: i32 = 20;
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum ReservationAction {
    Approve,
    Reject { reason: Option<String> },
}

impl ReservationAction {
    pub fn target_status(&self) -> ReservationStatus {
        match self {
            Self::Approve => ReservationStatus::Confirmed,
            Self::Reject { .. } => ReservationStatus::Cancelled,
        }
    }
}

/// Append a rejection note to whatever the customer wrote, separated by a
/// blank line. The original text is never replaced.
pub fn rejection_note(existing: Option<&str>, reason: Option<&str>) -> String {
    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REJECTION_REASON);
    let note = format!("Rechazado: {}", reason);

    match existing.filter(|text| !text.is_empty()) {
        Some(text) => format!("{}\n\n{}", text, note),
        None => note,
    }
}

/// The record as it looks after `action`, stamped with `now`.
pub fn apply_action(
    current: &reservation::Model,
    action: &ReservationAction,
    now: DateTime<Utc>,
) -> reservation::Model {
    let stamp = now.fixed_offset();
    let mut next = current.clone();
    next.status = action.target_status();
    next.updated_at = stamp;

    match action {
        ReservationAction::Approve => {
            next.confirmed_at = Some(stamp);
        }
        ReservationAction::Reject { reason } => {
            next.cancelled_at = Some(stamp);
            next.special_requests = Some(rejection_note(
                current.special_requests.as_deref(),
                reason.as_deref(),
            ));
        }
    }

    next
}

pub async fn approve(
    db: &DatabaseConnection,
    reservation_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    transition(db, reservation_id, ReservationAction::Approve, now).await
}

pub async fn reject(
    db: &DatabaseConnection,
    reservation_id: Uuid,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    transition(db, reservation_id, ReservationAction::Reject { reason }, now).await
}

async fn transition(
    db: &DatabaseConnection,
    reservation_id: Uuid,
    action: ReservationAction,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    let txn = db.begin().await?;

    let current = reservation::Entity::find_by_id(reservation_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

    let next = apply_action(&current, &action, now);
    let previous_status = current.status;

    let mut active: reservation::ActiveModel = current.into();
    active.status = Set(next.status);
    active.updated_at = Set(next.updated_at);
    active.confirmed_at = Set(next.confirmed_at);
    active.cancelled_at = Set(next.cancelled_at);
    active.special_requests = Set(next.special_requests.clone());
    let updated = active.update(&txn).await?;

    let note = match &action {
        ReservationAction::Approve => None,
        ReservationAction::Reject { reason } => reason.clone(),
    };
    record_history(&txn, updated.id, Some(previous_status), updated.status, note, now).await?;

    txn.commit().await?;

    tracing::info!(
        reservation_id = %updated.id,
        code = %updated.code,
        from = %previous_status,
        to = %updated.status,
        "Reservation status changed"
    );

    Ok(updated)
}

async fn record_history(
    txn: &DatabaseTransaction,
    reservation_id: Uuid,
    previous_status: Option<ReservationStatus>,
    new_status: ReservationStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    reservation_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        reservation_id: Set(reservation_id),
        previous_status: Set(previous_status),
        new_status: Set(new_status),
        note: Set(note),
        changed_at: Set(now.fixed_offset()),
    }
    .insert(txn)
    .await?;

    Ok(())
}

// ============ Table assignment ============

pub fn check_table_fits(
    reservation: &reservation::Model,
    table: &restaurant_table::Model,
) -> AppResult<()> {
    if table.restaurant_id != reservation.restaurant_id {
        return Err(AppError::BadRequest(
            "La mesa pertenece a otro restaurante".to_string(),
        ));
    }

    if !table.reservable {
        return Err(AppError::BadRequest("La mesa no es reservable".to_string()));
    }

    if table.capacity < reservation.party_size {
        return Err(AppError::BadRequest(format!(
            "La mesa {} admite {} comensales y la reserva es para {}",
            table.name, table.capacity, reservation.party_size
        )));
    }

    Ok(())
}

/// Seat a reservation at a table, or clear the assignment with `None`.
pub async fn assign_table(
    db: &DatabaseConnection,
    reservation_id: Uuid,
    table_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    let current = reservation::Entity::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

    if current.status == ReservationStatus::Cancelled && table_id.is_some() {
        return Err(AppError::Conflict(
            "No se puede asignar mesa a una reserva cancelada".to_string(),
        ));
    }

    if let Some(table_id) = table_id {
        let table = restaurant_table::Entity::find_by_id(table_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Mesa no encontrada".to_string()))?;
        check_table_fits(&current, &table)?;
    }

    let mut active: reservation::ActiveModel = current.into();
    active.table_id = Set(table_id);
    active.updated_at = Set(now.fixed_offset());
    let updated = active.update(db).await?;

    tracing::info!(reservation_id = %updated.id, table_id = ?table_id, "Table assignment changed");

    Ok(updated)
}

// ============ Booking ============

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub restaurant_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i32,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub special_requests: Option<String>,
}

pub struct BookingPolicy {
    pub fallback_timezone: Tz,
    pub session_hold_minutes: i64,
}

/// Checks that need no database access.
pub fn validate_booking(booking: &NewBooking, now_local: NaiveDateTime) -> AppResult<()> {
    if booking.party_size < 1 || booking.party_size > MAX_PARTY_SIZE {
        return Err(AppError::BadRequest(format!(
            "El número de comensales debe estar entre 1 y {}",
            MAX_PARTY_SIZE
        )));
    }

    if booking.customer_name.trim().is_empty() || booking.customer_phone.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Nombre y teléfono son obligatorios".to_string(),
        ));
    }

    if booking.date.and_time(booking.time) <= now_local {
        return Err(AppError::BadRequest(
            "No se puede reservar en una fecha u hora pasada".to_string(),
        ));
    }

    Ok(())
}

/// Create a pending reservation from the public booking flow.
pub async fn create(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    booking: NewBooking,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    let restaurant = restaurant::Entity::find_by_id(booking.restaurant_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurante no encontrado".to_string()))?;

    if !restaurant.active {
        return Err(AppError::BadRequest(
            "El restaurante no acepta reservas".to_string(),
        ));
    }

    let tz: Tz = restaurant.timezone.parse().unwrap_or(policy.fallback_timezone);
    validate_booking(&booking, local_now(tz, now))?;

    let available = slots::slots_for_date(db, restaurant.id, booking.date).await?;
    if !available.contains(&booking.time) {
        return Err(AppError::BadRequest(format!(
            "La hora {} no está disponible",
            format_time(booking.time)
        )));
    }

    // A concurrent booking can still take the code (or insert the same
    // customer) between the check and the insert.
    let mut attempt = 1;
    let created = loop {
        let code = unique_code(db).await?;
        match insert_booking(db, policy, &booking, restaurant.id, code, now).await {
            Err(AppError::Conflict(_)) if attempt < CODE_ATTEMPTS => {
                tracing::debug!(attempt, "Booking insert hit a unique key, retrying");
                attempt += 1;
            }
            result => break result?,
        }
    };

    tracing::info!(
        reservation_id = %created.id,
        code = %created.code,
        restaurant_id = %created.restaurant_id,
        date = %created.date,
        "Reservation created"
    );

    Ok(created)
}

async fn insert_booking(
    db: &DatabaseConnection,
    policy: &BookingPolicy,
    booking: &NewBooking,
    restaurant_id: Uuid,
    code: String,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    let stamp = now.fixed_offset();
    let txn = db.begin().await?;

    let customer_id = upsert_customer(&txn, booking, now).await?;

    let created = reservation::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        restaurant_id: Set(restaurant_id),
        customer_id: Set(customer_id),
        table_id: Set(None),
        date: Set(booking.date),
        time: Set(booking.time),
        party_size: Set(booking.party_size),
        status: Set(ReservationStatus::Pending),
        session_expires_at: Set(Some(
            (now + Duration::minutes(policy.session_hold_minutes)).fixed_offset(),
        )),
        special_requests: Set(booking
            .special_requests
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)),
        confirmed_at: Set(None),
        cancelled_at: Set(None),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(&txn)
    .await?;

    record_history(&txn, created.id, None, created.status, None, now).await?;

    txn.commit().await?;

    Ok(created)
}

async fn unique_code(db: &DatabaseConnection) -> AppResult<String> {
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_code();
        let taken = reservation::Entity::find()
            .filter(reservation::Column::Code.eq(code.as_str()))
            .one(db)
            .await?
            .is_some();
        if !taken {
            return Ok(code);
        }
        tracing::debug!(code = %code, "Reservation code collision");
    }

    Err(AppError::Internal(
        "Could not generate a unique reservation code".to_string(),
    ))
}

async fn upsert_customer(
    txn: &DatabaseTransaction,
    booking: &NewBooking,
    now: DateTime<Utc>,
) -> AppResult<Uuid> {
    let phone = booking.customer_phone.trim();

    let existing = customer::Entity::find()
        .filter(customer::Column::Phone.eq(phone))
        .one(txn)
        .await?;

    if let Some(found) = existing {
        if found.email.is_none() && booking.customer_email.is_some() {
            let id = found.id;
            let mut active: customer::ActiveModel = found.into();
            active.email = Set(booking.customer_email.clone());
            active.update(txn).await?;
            return Ok(id);
        }
        return Ok(found.id);
    }

    let created = customer::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(booking.customer_name.trim().to_string()),
        phone: Set(phone.to_string()),
        email: Set(booking.customer_email.clone()),
        created_at: Set(now.fixed_offset()),
    }
    .insert(txn)
    .await?;

    Ok(created.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn reservation_r1(special_requests: Option<&str>) -> reservation::Model {
        let created = Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap().fixed_offset();
        reservation::Model {
            id: Uuid::new_v4(),
            code: "RES-AB12C".to_string(),
            restaurant_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            table_id: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            party_size: 4,
            status: ReservationStatus::Pending,
            session_expires_at: None,
            special_requests: special_requests.map(str::to_string),
            confirmed_at: None,
            cancelled_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 25, 12, 0, 0).unwrap()
    }

    fn table_for(reservation: &reservation::Model, capacity: i32) -> restaurant_table::Model {
        restaurant_table::Model {
            id: Uuid::new_v4(),
            restaurant_id: reservation.restaurant_id,
            name: "T4".to_string(),
            capacity,
            pos_x: 120.0,
            pos_y: 80.0,
            width: 60.0,
            height: 60.0,
            shape: restaurant_table::TableShape::Round,
            reservable: true,
        }
    }

    #[test]
    fn test_table_must_fit_party() {
        let r1 = reservation_r1(None);

        assert!(check_table_fits(&r1, &table_for(&r1, 4)).is_ok());
        assert!(matches!(check_table_fits(&r1, &table_for(&r1, 2)), Err(AppError::BadRequest(_))));

        let mut elsewhere = table_for(&r1, 6);
        elsewhere.restaurant_id = Uuid::new_v4();
        assert!(matches!(check_table_fits(&r1, &elsewhere), Err(AppError::BadRequest(_))));

        let mut bar = table_for(&r1, 6);
        bar.reservable = false;
        assert!(matches!(check_table_fits(&r1, &bar), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_rejection_note_on_empty_text() {
        assert_eq!(rejection_note(None, Some("no disponible")), "Rechazado: no disponible");
        assert_eq!(rejection_note(Some(""), Some("no disponible")), "Rechazado: no disponible");
    }

    #[test]
    fn test_rejection_note_keeps_existing_text() {
        assert_eq!(
            rejection_note(Some("Mesa junto a la ventana"), Some("completo")),
            "Mesa junto a la ventana\n\nRechazado: completo"
        );
    }

    #[test]
    fn test_rejection_note_keeps_whitespace_only_text() {
        assert_eq!(rejection_note(Some("  "), Some("completo")), "  \n\nRechazado: completo");
    }

    #[test]
    fn test_rejection_note_default_reason() {
        assert_eq!(rejection_note(None, None), "Rechazado: Sin motivo especificado");
        assert_eq!(
            rejection_note(Some("Alergia al marisco"), Some("  ")),
            "Alergia al marisco\n\nRechazado: Sin motivo especificado"
        );
    }

    #[test]
    fn test_reject_r1_scenario() {
        let r1 = reservation_r1(None);
        let action = ReservationAction::Reject { reason: Some("no disponible".to_string()) };
        let next = apply_action(&r1, &action, now());

        assert_eq!(next.status, ReservationStatus::Cancelled);
        assert_eq!(next.cancelled_at, Some(now().fixed_offset()));
        assert_eq!(next.updated_at, now().fixed_offset());
        assert_eq!(next.special_requests.as_deref(), Some("Rechazado: no disponible"));
        assert_eq!(next.confirmed_at, None);
    }

    #[test]
    fn test_approve_stamps_confirmation() {
        let r1 = reservation_r1(Some("Cumpleaños"));
        let next = apply_action(&r1, &ReservationAction::Approve, now());

        assert_eq!(next.status, ReservationStatus::Confirmed);
        assert_eq!(next.confirmed_at, Some(now().fixed_offset()));
        assert_eq!(next.special_requests.as_deref(), Some("Cumpleaños"));
        assert_eq!(next.cancelled_at, None);
    }

    #[test]
    fn test_validate_booking_rejects_past_and_bad_party() {
        let booking = NewBooking {
            restaurant_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            party_size: 2,
            customer_name: "Lucía".to_string(),
            customer_phone: "+34600111222".to_string(),
            customer_email: None,
            special_requests: None,
        };
        let before = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(20, 0, 0).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(21, 30, 0).unwrap();

        assert!(validate_booking(&booking, before).is_ok());
        assert!(matches!(validate_booking(&booking, after), Err(AppError::BadRequest(_))));

        let crowd = NewBooking { party_size: MAX_PARTY_SIZE + 1, ..booking.clone() };
        assert!(matches!(validate_booking(&crowd, before), Err(AppError::BadRequest(_))));

        let nameless = NewBooking { customer_name: " ".to_string(), ..booking };
        assert!(matches!(validate_booking(&nameless, before), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_approve_missing_reservation_changes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<reservation::Model>::new()])
            .into_connection();

        let result = approve(&db, Uuid::new_v4(), now()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("UPDATE"));
        assert!(!log.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_reject_confirmed_reservation_cancels_it() {
        let mut confirmed = reservation_r1(Some("Terraza"));
        confirmed.status = ReservationStatus::Confirmed;
        confirmed.confirmed_at = Some(confirmed.created_at);

        let action = ReservationAction::Reject { reason: Some("cierre".to_string()) };
        let updated = apply_action(&confirmed, &action, now());
        assert_eq!(updated.status, ReservationStatus::Cancelled);
        assert_eq!(updated.cancelled_at, Some(now().fixed_offset()));
        assert_eq!(updated.special_requests.as_deref(), Some("Terraza\n\nRechazado: cierre"));

        let history = reservation_history::Model {
            id: Uuid::new_v4(),
            reservation_id: confirmed.id,
            previous_status: Some(ReservationStatus::Confirmed),
            new_status: ReservationStatus::Cancelled,
            note: Some("cierre".to_string()),
            changed_at: now().fixed_offset(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![confirmed.clone()]])
            .append_query_results([vec![updated]])
            .append_query_results([vec![history]])
            .into_connection();

        let result = reject(&db, confirmed.id, Some("cierre".to_string()), now())
            .await
            .unwrap();
        assert_eq!(result.status, ReservationStatus::Cancelled);
        assert_eq!(result.cancelled_at, Some(now().fixed_offset()));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("UPDATE"));
        assert!(log.contains("CANCELADO"));
    }

    #[tokio::test]
    async fn test_reject_writes_update_and_history() {
        let r1 = reservation_r1(None);
        let action = ReservationAction::Reject { reason: Some("no disponible".to_string()) };
        let updated = apply_action(&r1, &action, now());
        let history = reservation_history::Model {
            id: Uuid::new_v4(),
            reservation_id: r1.id,
            previous_status: Some(ReservationStatus::Pending),
            new_status: ReservationStatus::Cancelled,
            note: Some("no disponible".to_string()),
            changed_at: now().fixed_offset(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![r1.clone()]])
            .append_query_results([vec![updated.clone()]])
            .append_query_results([vec![history]])
            .into_connection();

        let result = reject(&db, r1.id, Some("no disponible".to_string()), now())
            .await
            .unwrap();
        assert_eq!(result.status, ReservationStatus::Cancelled);
        assert_eq!(result.special_requests.as_deref(), Some("Rechazado: no disponible"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("UPDATE"));
        assert!(log.contains("reservation_history"));
    }

    #[test]
    fn test_approve_cancelled_reservation_confirms_it() {
        let mut cancelled = reservation_r1(None);
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.cancelled_at = Some(cancelled.created_at);

        let next = apply_action(&cancelled, &ReservationAction::Approve, now());
        assert_eq!(next.status, ReservationStatus::Confirmed);
        assert_eq!(next.confirmed_at, Some(now().fixed_offset()));
    }

    #[tokio::test]
    async fn test_create_retries_when_insert_hits_unique_key() {
        use crate::entities::service::{self, DayType, Season, SlotMode};

        let stamp = now().fixed_offset();
        let restaurant = restaurant::Model {
            id: Uuid::new_v4(),
            name: "Casa Lola".to_string(),
            phone: "+34910000000".to_string(),
            email: "hola@casalola.es".to_string(),
            address: None,
            timezone: "Europe/Madrid".to_string(),
            active: true,
            created_at: stamp,
        };
        let dinner = service::Model {
            id: Uuid::new_v4(),
            restaurant_id: restaurant.id,
            name: "Cena".to_string(),
            day_type: DayType::Todos,
            season: Season::TodoElAno,
            start_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            slot_mode: SlotMode::Auto,
            slot_interval_minutes: 30,
            time_slots: None,
            table_ids: None,
            active: true,
        };
        let customer = customer::Model {
            id: Uuid::new_v4(),
            name: "Lucía".to_string(),
            phone: "+34600111222".to_string(),
            email: Some("lucia@example.com".to_string()),
            created_at: stamp,
        };
        let mut created = reservation_r1(None);
        created.restaurant_id = restaurant.id;
        created.customer_id = customer.id;
        let history = reservation_history::Model {
            id: Uuid::new_v4(),
            reservation_id: created.id,
            previous_status: None,
            new_status: ReservationStatus::Pending,
            note: None,
            changed_at: stamp,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![restaurant.clone()]])
            .append_query_results([vec![dinner]])
            .append_query_results([Vec::<reservation::Model>::new()])
            .append_query_results([vec![customer.clone()]])
            .append_query_errors([sea_orm::DbErr::Query(sea_orm::RuntimeErr::Internal(
                "duplicate key value violates unique constraint \"reservation_code_key\"".into(),
            ))])
            .append_query_results([Vec::<reservation::Model>::new()])
            .append_query_results([vec![customer]])
            .append_query_results([vec![created.clone()]])
            .append_query_results([vec![history]])
            .into_connection();

        let booking = NewBooking {
            restaurant_id: restaurant.id,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            party_size: 4,
            customer_name: "Lucía".to_string(),
            customer_phone: "+34600111222".to_string(),
            customer_email: None,
            special_requests: None,
        };
        let policy = BookingPolicy {
            fallback_timezone: chrono_tz::Europe::Madrid,
            session_hold_minutes: 15,
        };

        let result = create(&db, &policy, booking, now()).await.unwrap();
        assert_eq!(result.id, created.id);
        assert_eq!(result.status, ReservationStatus::Pending);
    }
}
