//! Device identifier validation.

use std::sync::OnceLock;

use regex::Regex;

/// MAC-address-like identifier: six hex octet pairs joined by dashes,
/// e.g. `aa-bb-cc-dd-ee-ff`.
const DEVICE_ID_PATTERN: &str = "^[0-9a-fA-F]{2}(?:-[0-9a-fA-F]{2}){5}$";

static DEVICE_ID_RE: OnceLock<Regex> = OnceLock::new();

/// Whether `id` is a well-formed device identifier.
pub fn is_device_id(id: &str) -> bool {
    DEVICE_ID_RE
        .get_or_init(|| Regex::new(DEVICE_ID_PATTERN).expect("device id pattern is valid"))
        .is_match(id)
}
