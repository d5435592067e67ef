// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Caster integration tests.

pub mod fixtures;
pub mod mock_transport;
pub mod progress;

pub use fixtures::store_fixture;
pub use mock_transport::{MockTransport, TransportCall};
pub use progress::CollectingSink;
