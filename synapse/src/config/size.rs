//! Human-readable byte sizes.

/// Parse a size such as `512`, `64K`, `256MB` or `2g` into bytes.
///
/// Suffixes are binary (1K = 1024) and case-insensitive.
pub fn parse_size(input: &str) -> Option<u64> {
    let s = input.trim().to_ascii_uppercase();
    let s = s.strip_suffix('B').unwrap_or(&s);

    let (digits, multiplier) = match s.chars().last()? {
        'K' => (&s[..s.len() - 1], 1024u64),
        'M' => (&s[..s.len() - 1], 1024 * 1024),
        'G' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };

    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

/// Format bytes for display (`1.5 MB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512"), Some(512));
        assert_eq!(parse_size("64K"), Some(64 * 1024));
        assert_eq!(parse_size("256MB"), Some(256 * 1024 * 1024));
        assert_eq!(parse_size(" 2g "), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_size("10b"), Some(10));
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("M"), None);
        assert_eq!(parse_size("lots"), None);
        assert_eq!(parse_size("-1K"), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(256 * 1024 * 1024), "256.0 MB");
    }
}
