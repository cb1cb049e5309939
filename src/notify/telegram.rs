use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use super::{rank_buckets, scan_buckets, ChatTransport};
use crate::{
    config::TelegramConfig,
    errors::{NotifyError, StoreError},
    store::MetricStore,
};

pub const MESSAGE_HEADER: &str = "**Uniswap High Volume Pairs:**\n\n";

/// telegram rejects anything much longer
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Bot API client, one request per message.
pub struct TelegramBot {
    client: reqwest::Client,
    url: String,
    chat_id: String,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/bot{}/sendMessage", config.api_url, config.token),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramBot {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Telegram(response.status()));
        }

        debug!(target: "uni-volume::notify", "sent telegram message (length={})", text.chars().count());

        Ok(())
    }
}

/// Backslash-escapes the characters legacy Markdown treats as entity markers,
/// so token symbols and amounts are sent verbatim.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Greedily packs `lines` into messages of at most `cap` characters, each
/// starting with `header`. Lines are never split; a single line longer than
/// the cap gets a message of its own.
pub fn pack_messages(header: &str, lines: &[String], cap: usize) -> Vec<String> {
    let header_len = header.chars().count();

    let mut messages = Vec::new();
    let mut current = header.to_string();
    let mut current_len = header_len;

    for line in lines {
        let line_len = line.chars().count();

        if current_len > header_len && current_len + line_len + 1 > cap {
            messages.push(std::mem::replace(&mut current, header.to_string()));
            current_len = header_len;
        }

        current.push_str(line);
        current.push('\n');
        current_len += line_len + 1;
    }

    if current_len > header_len {
        messages.push(current);
    }

    messages
}

pub struct TelegramNotifier {
    store: Arc<dyn MetricStore>,
    transport: Arc<dyn ChatTransport>,
    threshold: f64,
}

impl TelegramNotifier {
    pub fn new(store: Arc<dyn MetricStore>, transport: Arc<dyn ChatTransport>, threshold: f64) -> Self {
        Self { store, transport, threshold }
    }

    /// Scans the buckets and sends every qualifying one, packed into as few
    /// messages as fit. Returns how many messages went out.
    pub async fn notify(&self) -> Result<usize, StoreError> {
        let ranked = rank_buckets(scan_buckets(self.store.as_ref()).await?, self.threshold);
        info!(target: "uni-volume::notify", "{} high volume pairs", ranked.len());

        if ranked.is_empty() {
            return Ok(0);
        }

        let lines = ranked
            .iter()
            .map(|report| escape_markdown(&report.render()))
            .collect::<Vec<_>>();
        let messages = pack_messages(MESSAGE_HEADER, &lines, MAX_MESSAGE_CHARS);

        let mut sent = 0;
        for (idx, message) in messages.iter().enumerate() {
            match self.transport.send_message(message).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!(target: "uni-volume::notify", "error sending telegram message {}/{} - {:?}", idx + 1, messages.len(), e)
                }
            }
        }

        Ok(sent)
    }
}
