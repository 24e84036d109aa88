//! Outbound notification delivery.
//!
//! Delivery is fire-and-forget from the capture path's point of view: the
//! handler reads the returned flag, logs a failure, and answers the client
//! either way.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::models::AccessEvent;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification for a captured event; `false` on failure.
    async fn notify(&self, event: &AccessEvent) -> bool;
}

/// Notifications disabled.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &AccessEvent) -> bool {
        true
    }
}

/// Sends a Markdown summary of each capture to a Telegram chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            bot_token,
            chat_id,
        })
    }

    fn message_for(event: &AccessEvent) -> String {
        let location = match (event.geo.city.as_deref(), event.geo.country.as_deref()) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(city), None) => city.to_string(),
            (None, Some(country)) => country.to_string(),
            (None, None) => "N/A".to_string(),
        };
        let time = event
            .timestamp
            .map(|ts| ts.format("%d/%m/%Y %H:%M:%S").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let ua: String = event.ua.chars().take(50).collect();

        format!(
            "🔔 *New access captured*\n\n\
             🌐 *IP:* `{}`\n\
             📍 *Location:* {}\n\
             🏢 *Org:* {}\n\
             🕒 *Time:* {}\n\
             💻 *User-Agent:* {}",
            event.ip,
            location,
            event.geo.org.as_deref().unwrap_or("N/A"),
            time,
            ua,
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &AccessEvent) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": Self::message_for(event),
            "parse_mode": "Markdown",
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), ip = %event.ip, "telegram rejected notification");
                false
            }
            Err(err) => {
                warn!(error = %err, ip = %event.ip, "telegram notification failed");
                false
            }
        }
    }
}
