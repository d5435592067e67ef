// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `caster serve` command implementation.
//!
//! Wires the store, scheduler, Telegram transport, and dispatch engine
//! together, then runs the periodic driver until SIGINT/SIGTERM. The store
//! is constructed once here and shared by handle; nothing holds global
//! mutable state.

use std::sync::Arc;
use std::time::Duration;

use caster_config::model::{CasterConfig, TelegramConfig};
use caster_core::CasterError;
use caster_dispatch::{Dispatcher, Driver, install_signal_handler};
use caster_scheduler::Scheduler;
use caster_store::Store;
use caster_telegram::TelegramTransport;
use tracing::info;

/// Runs the `caster serve` command.
pub async fn run_serve(config: CasterConfig) -> Result<(), CasterError> {
    init_tracing(&config.console.log_level);
    info!("starting caster serve");

    // Missing identity/credentials are the only process-fatal conditions;
    // everything downstream degrades gracefully.
    let owner_id = config
        .console
        .owner_id
        .clone()
        .ok_or_else(|| CasterError::Config("console.owner_id is required for serve".into()))?;
    let telegram = effective_telegram_config(&config, &owner_id)?;

    let store = Arc::new(Store::open(
        &config.store.data_file,
        config.fixed_channels.clone(),
        Some(owner_id),
    ));
    info!(
        data_file = %config.store.data_file,
        fixed_channels = config.fixed_channels.len(),
        "store opened"
    );

    let transport = Arc::new(TelegramTransport::new(&telegram)?);
    let scheduler = Arc::new(Scheduler::new(store.clone()));
    let dispatcher = Arc::new(Dispatcher::new(transport, store.clone()));
    let driver = Driver::new(
        scheduler,
        dispatcher,
        store,
        Duration::from_secs(config.driver.poll_interval_secs),
    );

    let cancel = install_signal_handler();
    driver.run(cancel).await;

    info!("caster serve stopped");
    Ok(())
}

/// The transport's source chat defaults to the owner's private chat with
/// the bot when not configured explicitly.
fn effective_telegram_config(
    config: &CasterConfig,
    owner_id: &str,
) -> Result<TelegramConfig, CasterError> {
    let mut telegram = config.telegram.clone();
    if telegram.source_chat.is_none() {
        let owner_chat = owner_id
            .parse::<i64>()
            .map_err(|_| CasterError::Config("console.owner_id is not a valid chat id".into()))?;
        telegram.source_chat = Some(owner_chat);
    }
    Ok(telegram)
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("caster={level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_chat_defaults_to_owner_chat() {
        let mut config = CasterConfig::default();
        config.telegram.bot_token = Some("123:abc".to_string());
        let telegram = effective_telegram_config(&config, "123456789").unwrap();
        assert_eq!(telegram.source_chat, Some(123456789));
    }

    #[test]
    fn explicit_source_chat_wins() {
        let mut config = CasterConfig::default();
        config.telegram.source_chat = Some(-42);
        let telegram = effective_telegram_config(&config, "123456789").unwrap();
        assert_eq!(telegram.source_chat, Some(-42));
    }
}
