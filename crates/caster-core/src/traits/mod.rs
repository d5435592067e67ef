// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async trait seams the dispatch engine is generic over.

pub mod progress;
pub mod transport;
