// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Caster broadcast engine.
//!
//! Implements [`Transport`] over the Telegram Bot API via teloxide:
//! a delivery copies the referenced message from the operator's holding
//! chat into the target channel (so the original stays in place), and
//! footers go out as plain messages. The engine owns retries; every API
//! error is surfaced as a retryable [`CasterError::Transport`].

use async_trait::async_trait;
use caster_config::model::TelegramConfig;
use caster_core::{CasterError, ChannelId, DeliveredId, MessageRef, Transport};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tracing::debug;

/// Telegram transport implementing [`Transport`].
pub struct TelegramTransport {
    bot: Bot,
    /// The holding chat messages are copied from.
    source_chat: ChatId,
}

impl TelegramTransport {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` and `config.source_chat` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, CasterError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CasterError::Config("telegram.bot_token is required for the Telegram transport".into())
            })?;
        let source_chat = config.source_chat.ok_or_else(|| {
            CasterError::Config("telegram.source_chat is required for the Telegram transport".into())
        })?;

        Ok(Self {
            bot: Bot::new(token),
            source_chat: ChatId(source_chat),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(
        &self,
        channel: &ChannelId,
        message: MessageRef,
    ) -> Result<DeliveredId, CasterError> {
        let chat = parse_chat_id(channel)?;
        let delivered = self
            .bot
            .copy_message(chat, self.source_chat, MessageId(message.0 as i32))
            .await
            .map_err(map_api_error)?;
        debug!(channel = %channel, message = %message, "message copied to channel");
        Ok(DeliveredId(delivered.0.to_string()))
    }

    async fn deliver_text(&self, channel: &ChannelId, text: &str) -> Result<(), CasterError> {
        let chat = parse_chat_id(channel)?;
        self.bot
            .send_message(chat, text)
            .await
            .map_err(map_api_error)?;
        debug!(channel = %channel, "text delivered to channel");
        Ok(())
    }
}

fn parse_chat_id(channel: &ChannelId) -> Result<ChatId, CasterError> {
    channel
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| CasterError::transport(format!("channel id {channel} is not a chat id")))
}

fn map_api_error(err: teloxide::RequestError) -> CasterError {
    CasterError::Transport {
        message: err.to_string(),
        source: Some(Box::new(err)),
    }
}
