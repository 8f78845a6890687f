//! Outbound customer notifications. Delivery is delegated to WhatsApp; this
//! module only formats the message and hands it over.

pub mod webhook;
pub mod whatsapp;

use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use uuid::Uuid;

use crate::config::WhatsAppConfig;
use crate::entities::{customer, reservation, restaurant};
use crate::error::{AppError, AppResult};
use crate::utils::retry::{with_retry, DEFAULT_ATTEMPTS, DEFAULT_BACKOFF};
use crate::utils::time::format_time;

use whatsapp::WhatsAppClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Confirmation,
    Reminder,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReceipt {
    pub reservation_id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub provider_message_id: Option<String>,
}

#[derive(Clone)]
pub struct Notifier {
    whatsapp: Option<WhatsAppClient>,
}

impl Notifier {
    pub fn new(config: &WhatsAppConfig) -> Self {
        let whatsapp = WhatsAppClient::from_config(config);
        if whatsapp.is_none() {
            tracing::warn!("WhatsApp credentials missing, notifications disabled");
        }
        Self { whatsapp }
    }

    pub fn disabled() -> Self {
        Self { whatsapp: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.whatsapp.is_some()
    }

    pub async fn send_reservation_confirmation(
        &self,
        db: &DatabaseConnection,
        reservation_id: Uuid,
    ) -> AppResult<NotificationReceipt> {
        self.send(db, reservation_id, NotificationKind::Confirmation).await
    }

    pub async fn send_reservation_reminder(
        &self,
        db: &DatabaseConnection,
        reservation_id: Uuid,
    ) -> AppResult<NotificationReceipt> {
        self.send(db, reservation_id, NotificationKind::Reminder).await
    }

    async fn send(
        &self,
        db: &DatabaseConnection,
        reservation_id: Uuid,
        kind: NotificationKind,
    ) -> AppResult<NotificationReceipt> {
        let reservation = reservation::Entity::find_by_id(reservation_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Reserva no encontrada".to_string()))?;

        let client = self
            .whatsapp
            .as_ref()
            .ok_or_else(|| AppError::Notification("Notificaciones no configuradas".to_string()))?;

        let restaurant = restaurant::Entity::find_by_id(reservation.restaurant_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::Internal("Restaurant missing for reservation".to_string()))?;
        let customer = customer::Entity::find_by_id(reservation.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::Internal("Customer missing for reservation".to_string()))?;

        let body = format_message(kind, &reservation, &restaurant, &customer);
        let provider_message_id = with_retry(DEFAULT_ATTEMPTS, DEFAULT_BACKOFF, || {
            client.send_text(&customer.phone, &body)
        })
        .await?;

        tracing::info!(
            reservation_id = %reservation.id,
            kind = ?kind,
            message_id = ?provider_message_id,
            "Notification sent"
        );

        Ok(NotificationReceipt {
            reservation_id: reservation.id,
            kind,
            recipient: customer.phone,
            provider_message_id,
        })
    }
}

fn guests(party_size: i32) -> String {
    if party_size == 1 {
        "1 persona".to_string()
    } else {
        format!("{} personas", party_size)
    }
}

pub fn format_message(
    kind: NotificationKind,
    reservation: &reservation::Model,
    restaurant: &restaurant::Model,
    customer: &customer::Model,
) -> String {
    let date = reservation.date.format("%d/%m/%Y");
    let time = format_time(reservation.time);

    match kind {
        NotificationKind::Confirmation => format!(
            "Hola {}, tu reserva {} en {} para {} el {} a las {} está confirmada. ¡Te esperamos!",
            customer.name,
            reservation.code,
            restaurant.name,
            guests(reservation.party_size),
            date,
            time
        ),
        NotificationKind::Reminder => format!(
            "Hola {}, te recordamos tu reserva {} en {} el {} a las {} para {}. Si no puedes venir, llámanos al {}.",
            customer.name,
            reservation.code,
            restaurant.name,
            date,
            time,
            guests(reservation.party_size),
            restaurant.phone
        ),
    }
}
