//! Utility functions for hex prefixes and timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Ensures a hex string carries the 0x prefix.
pub fn with_0x_prefix(hex: &str) -> String {
	if hex.starts_with("0x") {
		hex.to_string()
	} else {
		format!("0x{}", hex)
	}
}

/// Strips the 0x prefix from a hex string if present.
pub fn without_0x_prefix(hex: &str) -> &str {
	hex.strip_prefix("0x").unwrap_or(hex)
}

/// The current unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
