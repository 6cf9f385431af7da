//! Channel message endpoints and the rate-limit retry loop.

use super::types::{DcBulkDelete, DcCreateMessage, DcCreated, DcError, DcMessage, DcRateLimit};
use super::DiscordClient;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use twobot_core::{
    error::BotError,
    message::Message,
    snowflake::Snowflake,
    traits::{MessageApi, MAX_BULK_DELETE, MAX_PAGE_SIZE},
};

const MAX_BACKOFF: Duration = Duration::from_secs(60);

impl DiscordClient {
    /// Send a request, sleeping through `429`s up to `max_retries` times.
    ///
    /// Returns the first non-429 response as-is; status checks are the
    /// caller's job.
    async fn send<F>(&self, what: &str, build: F) -> Result<Response, BotError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut backoff = self.backoff_base;
        let mut attempt = 0;
        loop {
            let resp = build()
                .send()
                .await
                .map_err(|e| BotError::Platform(format!("discord {what} failed: {e}")))?;
            if resp.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(resp);
            }

            let wait = retry_after(resp).await.unwrap_or(backoff);
            if attempt >= self.max_retries {
                warn!("discord {what}: still rate limited after {attempt} retries");
                return Err(BotError::RateLimited {
                    retry_after_ms: wait.as_millis() as u64,
                });
            }
            attempt += 1;
            warn!(
                "discord {what} rate limited (retry {attempt}/{} in {}ms)",
                self.max_retries,
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Post a plain text message to a channel.
    ///
    /// Returns the id of the created message.
    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        content: &str,
    ) -> Result<Snowflake, BotError> {
        let url = self.url(&format!("/channels/{channel_id}/messages"));
        let body = DcCreateMessage { content };
        let resp = self
            .send("create message", || self.client.post(&url).json(&body))
            .await?;
        let created: DcCreated = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| BotError::Platform(format!("discord message parse failed: {e}")))?;
        Ok(created.id)
    }

    async fn delete_one(&self, channel_id: Snowflake, id: Snowflake) -> Result<(), BotError> {
        let url = self.url(&format!("/channels/{channel_id}/messages/{id}"));
        let resp = self
            .send("delete message", || self.client.delete(&url))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!("message {id} in {channel_id} already gone");
            return Ok(());
        }
        check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageApi for DiscordClient {
    async fn get_messages(
        &self,
        channel_id: Snowflake,
        limit: usize,
        before: Option<Snowflake>,
    ) -> Result<Vec<Message>, BotError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let mut url = self.url(&format!("/channels/{channel_id}/messages?limit={limit}"));
        if let Some(before) = before {
            url.push_str(&format!("&before={before}"));
        }

        let resp = self
            .send("get messages", || self.client.get(&url))
            .await?;
        let page: Vec<DcMessage> = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| BotError::Platform(format!("discord messages parse failed: {e}")))?;
        Ok(page.into_iter().map(Message::from).collect())
    }

    async fn bulk_delete(&self, channel_id: Snowflake, ids: &[Snowflake]) -> Result<(), BotError> {
        match ids {
            [] => Ok(()),
            // The bulk endpoint rejects fewer than two ids.
            [id] => self.delete_one(channel_id, *id).await,
            _ if ids.len() > MAX_BULK_DELETE => Err(BotError::Platform(format!(
                "bulk delete of {} ids exceeds {MAX_BULK_DELETE}",
                ids.len()
            ))),
            _ => {
                let url = self.url(&format!("/channels/{channel_id}/messages/bulk-delete"));
                let body = DcBulkDelete { messages: ids };
                let resp = self
                    .send("bulk delete", || self.client.post(&url).json(&body))
                    .await?;
                check(resp).await?;
                Ok(())
            }
        }
    }
}

/// Wait requested by a `429`: JSON `retry_after`, else the `Retry-After` header.
async fn retry_after(resp: Response) -> Option<Duration> {
    let header = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());
    let body = resp.json::<DcRateLimit>().await.ok();
    if let Some(limit) = &body {
        if limit.global {
            debug!("discord global rate limit hit");
        }
    }
    body.map(|b| b.retry_after)
        .or(header)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Map a non-success status to [`BotError::Rejected`].
async fn check(resp: Response) -> Result<Response, BotError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<DcError>(&text) {
        Ok(err) if err.code != 0 => format!("{} (code {})", err.message, err.code),
        Ok(err) => err.message,
        Err(_) => text,
    };
    Err(BotError::Rejected {
        status: status.as_u16(),
        message,
    })
}
