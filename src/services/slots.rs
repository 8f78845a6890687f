use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::service::{self, DayType, Season, SlotMode};
use crate::error::AppResult;

pub fn day_type_of(date: NaiveDate) -> DayType {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => DayType::FinDeSemana,
        _ => DayType::Laborable,
    }
}

/// Summer runs June through September.
pub fn season_of(date: NaiveDate) -> Season {
    match date.month() {
        6..=9 => Season::Verano,
        _ => Season::Invierno,
    }
}

pub fn service_applies(service: &service::Model, date: NaiveDate) -> bool {
    let day_matches = service.day_type == DayType::Todos || service.day_type == day_type_of(date);
    let season_matches = service.season == Season::TodoElAno || service.season == season_of(date);
    service.active && day_matches && season_matches
}

/// Bookable start times of a single service, sorted and deduplicated.
pub fn generate_slots(service: &service::Model) -> Vec<NaiveTime> {
    let mut slots = match service.slot_mode {
        SlotMode::Auto => {
            let step = Duration::minutes(i64::from(service.slot_interval_minutes.max(1)));
            let mut slots = Vec::new();
            let mut current = service.start_time;
            while current < service.end_time {
                slots.push(current);
                let (next, wrapped) = current.overflowing_add_signed(step);
                if wrapped != 0 {
                    break;
                }
                current = next;
            }
            slots
        }
        SlotMode::Manual => service
            .manual_slots()
            .into_iter()
            .filter(|t| *t >= service.start_time && *t < service.end_time)
            .collect(),
    };

    slots.sort();
    slots.dedup();
    slots
}

pub fn available_slots(services: &[service::Model], date: NaiveDate) -> Vec<NaiveTime> {
    let mut slots: Vec<NaiveTime> = services
        .iter()
        .filter(|s| service_applies(s, date))
        .flat_map(generate_slots)
        .collect();

    slots.sort();
    slots.dedup();
    slots
}

pub async fn slots_for_date(
    db: &DatabaseConnection,
    restaurant_id: Uuid,
    date: NaiveDate,
) -> AppResult<Vec<NaiveTime>> {
    let services = service::Entity::find()
        .filter(service::Column::RestaurantId.eq(restaurant_id))
        .filter(service::Column::Active.eq(true))
        .all(db)
        .await?;

    Ok(available_slots(&services, date))
}
