use chrono::Local;
use chrono::format::{Item, StrftimeItems};

/// Format used when the configured one is unusable
pub const FALLBACK_FORMAT: &str = "%Y-%m-%d";

/// True if chrono can render `format` without error.
pub fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Today's local date in `format`, falling back to ISO dates for a bad format.
pub fn today_str(format: &str) -> String {
    let format = if is_valid_format(format) {
        format
    } else {
        log::warn!("invalid date format {:?}; using {}", format, FALLBACK_FORMAT);
        FALLBACK_FORMAT
    };
    Local::now().format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_formats() {
        assert!(is_valid_format("%Y-%m-%d"));
        assert!(is_valid_format("%Y/%-m/%-d"));
        assert!(!is_valid_format("%Q"));
        assert!(!is_valid_format(""));
    }

    #[test]
    fn bad_format_falls_back() {
        let today = today_str("%Q");
        assert_eq!(today, Local::now().format(FALLBACK_FORMAT).to_string());
    }
}
