//! Shared utilities for adapter-layer validation.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// Used for email addresses, which deep links pass through unencoded.
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Returns `true` if `s` has no control characters. Non-ASCII letters are
/// fine; caregiver names are free text.
pub(super) fn is_printable(s: &str) -> bool {
    !s.chars().any(char::is_control)
}
