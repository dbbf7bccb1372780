//! Formatting helpers for log output.

/// Truncates an identifier for display.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("ord-1"), "ord-1");
		assert_eq!(truncate_id("66f1c0a9d2e4b71a"), "66f1c0a9..");
		assert_eq!(truncate_id("12345678"), "12345678");
	}
}
