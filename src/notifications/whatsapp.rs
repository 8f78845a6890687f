use serde::Deserialize;
use serde_json::json;

use crate::config::WhatsAppConfig;
use crate::error::{AppError, AppResult};

/// Minimal client for the WhatsApp Cloud API text message endpoint.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    api_url: String,
    phone_number_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl WhatsAppClient {
    /// `None` unless both the phone number id and the access token are configured.
    pub fn from_config(config: &WhatsAppConfig) -> Option<Self> {
        let phone_number_id = config.phone_number_id.clone()?;
        let access_token = config.access_token.clone()?;

        Some(Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            phone_number_id,
            access_token,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_url, self.phone_number_id)
    }

    /// Send a plain text message and return the provider's message id.
    pub async fn send_text(&self, to: &str, body: &str) -> AppResult<Option<String>> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": recipient_number(to),
            "type": "text",
            "text": { "body": body }
        });

        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("WhatsApp no disponible: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_text, "WhatsApp API error");
            return Err(AppError::Notification(format!(
                "WhatsApp rechazó el mensaje ({})",
                status
            )));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| AppError::Notification(format!("Respuesta de WhatsApp no válida: {}", e)))?;

        Ok(parsed.messages.into_iter().next().map(|m| m.id))
    }
}

/// The Cloud API wants the number in international format without `+` or spacing.
pub fn recipient_number(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
