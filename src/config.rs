use std::env;

use chrono_tz::Tz;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    /// Timezone used to decide what "today" and "now" mean for the admin queue.
    pub timezone: Tz,
    pub session_hold_minutes: i64,
    pub whatsapp: WhatsAppConfig,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
    pub verify_token: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            timezone: env::var("RESTAURANT_TIMEZONE")
                .unwrap_or_else(|_| "Europe/Madrid".to_string())
                .parse()
                .expect("RESTAURANT_TIMEZONE must be a valid IANA timezone"),
            session_hold_minutes: env::var("SESSION_HOLD_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("SESSION_HOLD_MINUTES must be a number"),
            whatsapp: WhatsAppConfig {
                api_url: env::var("WHATSAPP_API_URL")
                    .unwrap_or_else(|_| "https://graph.facebook.com/v17.0".to_string()),
                phone_number_id: env::var("WHATSAPP_PHONE_NUMBER_ID").ok(),
                access_token: env::var("WHATSAPP_ACCESS_TOKEN").ok(),
                verify_token: env::var("WHATSAPP_VERIFY_TOKEN")
                    .unwrap_or_else(|_| "webhook_verify".to_string()),
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
