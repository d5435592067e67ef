// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core trait definitions, error types, and domain types for the Caster
//! broadcast engine.
//!
//! Everything the engine crates share lives here: the single error taxonomy
//! ([`CasterError`]), the domain newtypes ([`ChannelId`], [`MessageRef`]),
//! the operator-facing [`Batch`] and [`ChannelSelection`], and the two
//! async seams the dispatch engine is generic over ([`Transport`] and
//! [`ProgressSink`]).

pub mod batch;
pub mod error;
pub mod traits;
pub mod types;
pub mod validate;

pub use batch::{Batch, ChannelSelection, PushReceipt};
pub use error::CasterError;
pub use traits::progress::{NullSink, ProgressSink};
pub use traits::transport::Transport;
pub use types::{
    ChannelId, DeliveredId, DeliveryFailure, MessageRef, Progress, RunResult, RunSettings,
};
pub use validate::{validate_channel_id, validate_user_id};
