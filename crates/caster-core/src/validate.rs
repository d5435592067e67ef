// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shape validation for operator-supplied identifiers.

use std::sync::LazyLock;

use regex::Regex;

/// Channel IDs are platform supergroup/channel chat IDs: `-100` followed by
/// at least ten digits.
static CHANNEL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-100\d{10,}$").expect("channel id regex"));

/// Returns true when `id` has the canonical channel-ID shape.
pub fn validate_channel_id(id: &str) -> bool {
    CHANNEL_ID_RE.is_match(id)
}

/// Returns true when `id` is a plausible operator user ID: non-empty,
/// decimal digits only, at most 20 characters.
pub fn validate_user_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 20 && id.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_channel_ids() {
        assert!(validate_channel_id("-1002504723776"));
        assert!(validate_channel_id("-100123456789012345"));
    }

    #[test]
    fn rejects_malformed_channel_ids() {
        assert!(!validate_channel_id(""));
        assert!(!validate_channel_id("-100123")); // too few digits
        assert!(!validate_channel_id("1002504723776")); // missing sign
        assert!(!validate_channel_id("-2002504723776")); // wrong prefix
        assert!(!validate_channel_id("-100250472377a")); // non-digit
        assert!(!validate_channel_id(" -1002504723776")); // leading space
    }

    #[test]
    fn accepts_plain_numeric_user_ids() {
        assert!(validate_user_id("1"));
        assert!(validate_user_id("123456789"));
        assert!(validate_user_id("12345678901234567890")); // exactly 20
    }

    #[test]
    fn rejects_malformed_user_ids() {
        assert!(!validate_user_id(""));
        assert!(!validate_user_id("-12345"));
        assert!(!validate_user_id("12a45"));
        assert!(!validate_user_id("123456789012345678901")); // 21 digits
    }
}
