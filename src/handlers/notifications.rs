use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppQuery};
use crate::notifications::webhook::{WebhookVerifyQuery, WhatsAppWebhook};
use crate::notifications::NotificationReceipt;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub action: String,
    pub reservation_id: Uuid,
}

/// Send a confirmation or reminder to the customer of a reservation (admin)
pub async fn send_notification(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NotificationRequest>,
) -> AppResult<Json<NotificationReceipt>> {
    let receipt = match payload.action.trim() {
        "send-confirmation" => {
            state
                .notifier
                .send_reservation_confirmation(&state.db, payload.reservation_id)
                .await?
        }
        "send-reminder" => {
            state
                .notifier
                .send_reservation_reminder(&state.db, payload.reservation_id)
                .await?
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Acción no válida: '{}'. Usa 'send-confirmation' o 'send-reminder'",
                other
            )));
        }
    };

    Ok(Json(receipt))
}

/// Subscription handshake from the messaging provider
pub async fn verify_webhook(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<WebhookVerifyQuery>,
) -> (StatusCode, String) {
    tracing::info!("WhatsApp webhook verification request received");

    match params.accepted_challenge(&state.config.whatsapp.verify_token) {
        Some(challenge) => {
            tracing::info!("Webhook verification successful");
            (StatusCode::OK, challenge)
        }
        None => {
            tracing::warn!(mode = ?params.mode, "Webhook verification rejected");
            (StatusCode::FORBIDDEN, "Verificación no válida".to_string())
        }
    }
}

/// Provider callbacks. Always acknowledged so the provider does not retry.
pub async fn receive_webhook(body: Bytes) -> StatusCode {
    match serde_json::from_slice::<WhatsAppWebhook>(&body) {
        Ok(webhook) => {
            for status in webhook.statuses() {
                tracing::info!(
                    message_id = %status.id,
                    status = %status.status,
                    recipient = %status.recipient_id,
                    "WhatsApp delivery status"
                );
            }

            let incoming = webhook.incoming_message_count();
            if incoming > 0 {
                tracing::debug!(count = incoming, "Ignoring inbound WhatsApp messages");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Unrecognized webhook payload");
        }
    }

    StatusCode::OK
}
