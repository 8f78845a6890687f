use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl WebhookVerifyQuery {
    /// The challenge to echo back when the subscription request is genuine.
    pub fn accepted_challenge(&self, expected_token: &str) -> Option<String> {
        let subscribing = self.mode.as_deref() == Some("subscribe");
        let token_matches = self.verify_token.as_deref() == Some(expected_token);

        if subscribing && token_matches {
            Some(self.challenge.clone().unwrap_or_default())
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WhatsAppWebhook {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WhatsAppEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WhatsAppEntry {
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WhatsAppChange>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WhatsAppChange {
    pub field: String,
    pub value: WhatsAppValue,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WhatsAppValue {
    #[serde(default)]
    pub messaging_product: Option<String>,
    #[serde(default)]
    pub statuses: Vec<WhatsAppStatus>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

/// Delivery report for a message we sent.
#[derive(Debug, Deserialize, Serialize)]
pub struct WhatsAppStatus {
    pub id: String,
    pub status: String,
    pub recipient_id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WhatsAppWebhook {
    pub fn statuses(&self) -> impl Iterator<Item = &WhatsAppStatus> {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .filter(|c| c.field == "messages")
            .flat_map(|c| c.value.statuses.iter())
    }

    pub fn incoming_message_count(&self) -> usize {
        self.entry
            .iter()
            .flat_map(|e| e.changes.iter())
            .map(|c| c.value.messages.len())
            .sum()
    }
}
