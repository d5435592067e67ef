// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch engine and run driver for the Caster broadcast engine.
//!
//! [`engine::Dispatcher`] executes one posting run over the message ×
//! channel cartesian product with bounded retries and progress reporting.
//! [`driver::Driver`] is the periodic loop that pulls due jobs from the
//! scheduler and hands each to the engine exactly once.

pub mod driver;
pub mod engine;
pub mod shutdown;

pub use driver::Driver;
pub use engine::{Dispatcher, RETRY_PAUSE};
pub use shutdown::install_signal_handler;
